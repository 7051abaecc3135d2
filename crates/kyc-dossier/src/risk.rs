//! Aggregation of the registry adapters into one classified result.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::{classify, Document, DocumentError, DocumentKind};
use crate::registry::{
    AddressDirectory, AddressRecord, OrganizationRegistry, RegistryRecord, RegistrySources,
    SanctionsRecord, SanctionsRegistry, SourceStatus,
};

const ACTIVE_MARKERS: [&str; 2] = ["ATIVA", "ACTIVE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Case-insensitive substring check for an active registration marker.
///
/// English "INACTIVE" also matches `ACTIVE`.
pub fn is_active_status(registration_status: &str) -> bool {
    let upper = registration_status.to_uppercase();
    ACTIVE_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// Pure risk rule: any sanction is HIGH; otherwise organizations are graded by registration status.
///
/// An organization with no reported status falls through to LOW.
pub fn assess_risk(kind: DocumentKind, sanctions_total: usize, registration_status: &str) -> RiskLevel {
    if sanctions_total > 0 {
        return RiskLevel::High;
    }

    match kind {
        DocumentKind::Organization => {
            let status = registration_status.trim();
            if is_active_status(status) || status.is_empty() {
                RiskLevel::Low
            } else {
                RiskLevel::Medium
            }
        }
        DocumentKind::Person => RiskLevel::Low,
    }
}

/// Everything learned about one identifier in a single check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub document: String,
    pub kind: DocumentKind,
    #[serde(default)]
    pub registry: Option<RegistryRecord>,
    #[serde(default)]
    pub registry_sources: RegistrySources,
    #[serde(default)]
    pub address: Option<AddressRecord>,
    #[serde(default)]
    pub address_status: SourceStatus,
    #[serde(default)]
    pub sanctions: SanctionsRecord,
    #[serde(default)]
    pub sanctions_status: SourceStatus,
    pub checked_at: DateTime<Utc>,
}

impl AggregationResult {
    pub fn registration_status(&self) -> &str {
        self.registry
            .as_ref()
            .map(|record| record.registration_status.as_str())
            .unwrap_or_default()
    }

    pub fn sanctions_total(&self) -> usize {
        self.sanctions.total()
    }

    /// Recomputed on every call; never persisted on its own.
    pub fn risk_level(&self) -> RiskLevel {
        assess_risk(self.kind, self.sanctions_total(), self.registration_status())
    }

    /// Registry-provided name, if any.
    pub fn registry_name(&self) -> Option<&str> {
        self.registry.as_ref().and_then(RegistryRecord::display_name)
    }

    pub fn as_document(&self) -> Document {
        Document {
            kind: self.kind,
            clean: self.document.clone(),
        }
    }

    /// Registry name or the `"<KIND> <digits>"` placeholder.
    pub fn entity_name(&self) -> String {
        self.registry_name()
            .map(str::to_string)
            .unwrap_or_else(|| self.as_document().placeholder_name())
    }
}

/// Runs the registry adapters for one identifier.
///
/// Calls are issued one after another; upstream quotas are per key and bursts get throttled.
#[derive(Clone)]
pub struct RiskAggregator {
    organizations: Arc<dyn OrganizationRegistry>,
    addresses: Arc<dyn AddressDirectory>,
    sanctions: Arc<dyn SanctionsRegistry>,
}

impl RiskAggregator {
    pub fn new(
        organizations: Arc<dyn OrganizationRegistry>,
        addresses: Arc<dyn AddressDirectory>,
        sanctions: Arc<dyn SanctionsRegistry>,
    ) -> Self {
        Self {
            organizations,
            addresses,
            sanctions,
        }
    }

    /// Classifies `raw` then aggregates; only classification can fail.
    pub async fn check(
        &self,
        raw: &str,
        postal_code: Option<&str>,
    ) -> Result<AggregationResult, DocumentError> {
        let document = classify(raw)?;
        Ok(self.aggregate(&document, postal_code).await)
    }

    /// Never fails: adapter errors are recorded as source statuses.
    pub async fn aggregate(&self, document: &Document, postal_code: Option<&str>) -> AggregationResult {
        let mut postal_code = postal_code
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string);

        let (registry, registry_sources) = match document.kind {
            DocumentKind::Organization => match self.organizations.lookup(&document.clean).await {
                Ok(lookup) => {
                    if postal_code.is_none() && !lookup.record.address.postal_code.is_empty() {
                        postal_code = Some(lookup.record.address.postal_code.clone());
                    }
                    (Some(lookup.record), lookup.sources)
                }
                Err(err) => {
                    warn!(document = %document.clean, error = %err, "company registries unavailable");
                    let status = SourceStatus::failed(&err);
                    (
                        None,
                        RegistrySources {
                            primary: status.clone(),
                            secondary: status,
                        },
                    )
                }
            },
            DocumentKind::Person => (None, RegistrySources::default()),
        };

        let (address, address_status) = match postal_code.as_deref() {
            Some(code) => match self.addresses.lookup(code).await {
                Ok(address) => (Some(address), SourceStatus::Ok),
                Err(err) => {
                    warn!(postal_code = code, error = %err, "postal lookup failed");
                    (None, SourceStatus::failed(&err))
                }
            },
            None => (None, SourceStatus::NotQueried),
        };

        let (sanctions, sanctions_status) = match self.sanctions.search(document).await {
            Ok(record) => (record, SourceStatus::Ok),
            Err(err) => {
                warn!(document = %document.clean, error = %err, "sanctions lookup skipped");
                (SanctionsRecord::unavailable(&err), SourceStatus::failed(&err))
            }
        };

        let result = AggregationResult {
            document: document.clean.clone(),
            kind: document.kind,
            registry,
            registry_sources,
            address,
            address_status,
            sanctions,
            sanctions_status,
            checked_at: Utc::now(),
        };

        info!(
            document = %result.document,
            kind = %result.kind,
            sanctions = result.sanctions_total(),
            risk = %result.risk_level(),
            "aggregation complete"
        );

        result
    }
}
