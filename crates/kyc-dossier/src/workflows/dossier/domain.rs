use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{Document, DocumentKind};
use crate::registry::{AddressRecord, Partner, RegistryRecord, SanctionsRecord, SourceStatus};
use crate::risk::{AggregationResult, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DossierId(pub Uuid);

impl DossierId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }
}

impl fmt::Display for DossierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl DecisionStatus {
    pub fn from_approval(approved: bool) -> Self {
        if approved {
            Self::Approved
        } else {
            Self::Rejected
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DecisionStatus::Pending => "PENDING",
            DecisionStatus::Approved => "APPROVED",
            DecisionStatus::Rejected => "REJECTED",
        }
    }
}

/// Persisted point-in-time check plus its decision state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dossier {
    pub id: DossierId,
    pub tenant_id: String,
    pub document: String,
    pub kind: DocumentKind,
    pub entity_name: String,
    pub risk_level: RiskLevel,
    pub report: DossierReport,
    pub decision_status: DecisionStatus,
    pub approved: bool,
    pub compliance_opinion: Option<String>,
    pub rejection_justification: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Dossier {
    /// Fresh pending dossier built from one aggregation.
    pub fn from_aggregation(
        tenant_id: &str,
        result: &AggregationResult,
        narrative: Option<String>,
    ) -> Self {
        Self {
            id: DossierId::generate(),
            tenant_id: tenant_id.to_string(),
            document: result.document.clone(),
            kind: result.kind,
            entity_name: result.entity_name(),
            risk_level: result.risk_level(),
            report: DossierReport::from_aggregation(result, narrative),
            decision_status: DecisionStatus::Pending,
            approved: false,
            compliance_opinion: None,
            rejection_justification: None,
            decided_at: None,
            decided_by: None,
            created_at: Utc::now(),
        }
    }

    /// Stored name, then the company summary, then the placeholder.
    pub fn display_name(&self) -> String {
        if !self.entity_name.trim().is_empty() {
            return self.entity_name.clone();
        }

        self.report
            .technical_report
            .derived
            .company_summary
            .as_ref()
            .and_then(CompanySummary::name)
            .map(str::to_string)
            .unwrap_or_else(|| {
                Document {
                    kind: self.kind,
                    clean: self.document.clone(),
                }
                .placeholder_name()
            })
    }

    pub fn with_display_name(mut self) -> Self {
        self.entity_name = self.display_name();
        self
    }

    pub fn apply_decision(&mut self, decision: &Decision) {
        self.decision_status = DecisionStatus::from_approval(decision.approved);
        self.approved = decision.approved;
        self.compliance_opinion = Some(decision.opinion.clone());
        self.rejection_justification = decision.justification.clone();
        self.decided_at = Some(decision.decided_at);
        self.decided_by = Some(decision.decided_by.clone());
    }

    pub fn summary(&self) -> DossierSummary {
        DossierSummary {
            dossier_id: self.id,
            entity_name: self.entity_name.clone(),
            risk_level: self.risk_level,
            document: self.document.clone(),
            doc_type: self.kind,
        }
    }
}

/// Decision recorded against a dossier; re-deciding replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub opinion: String,
    pub approved: bool,
    pub justification: Option<String>,
    pub decided_by: String,
    pub decided_at: DateTime<Utc>,
}

/// Response returned after a dossier has been created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DossierSummary {
    pub dossier_id: DossierId,
    pub entity_name: String,
    pub risk_level: RiskLevel,
    pub document: String,
    pub doc_type: DocumentKind,
}

/// Nested report stored with every dossier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DossierReport {
    pub metadata: ReportMetadata,
    pub technical_report: TechnicalReport,
    pub sanctions: SanctionsRecord,
    pub total_sanctions: usize,
    pub narrative: Option<String>,
}

impl DossierReport {
    pub fn from_aggregation(result: &AggregationResult, narrative: Option<String>) -> Self {
        let sanctions = &result.sanctions;
        let company_summary = result.registry.as_ref().map(CompanySummary::from_record);
        let ownership_roster = result
            .registry
            .as_ref()
            .map(|record| record.ownership_roster.clone())
            .unwrap_or_default();

        Self {
            metadata: ReportMetadata {
                document_type: result.kind,
                generated_at: result.checked_at,
            },
            technical_report: TechnicalReport {
                input: ReportInput {
                    document: result.document.clone(),
                    kind: result.kind,
                },
                sources: ReportSources {
                    primary_registry: result.registry_sources.primary.clone(),
                    secondary_registry: result.registry_sources.secondary.clone(),
                    postal_lookup: result.address_status.clone(),
                    sanctions_debarment: sanctions.debarment.status.clone(),
                    sanctions_corporate_penalty: sanctions.corporate_penalty.status.clone(),
                    sanctions_nonprofit_impediment: sanctions.nonprofit_impediment.status.clone(),
                },
                registry: result.registry.clone(),
                address: result.address.clone(),
                derived: DerivedSummary {
                    company_summary,
                    ownership_roster,
                },
            },
            sanctions: sanctions.clone(),
            total_sanctions: sanctions.total(),
            narrative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub document_type: DocumentKind,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalReport {
    pub input: ReportInput,
    pub sources: ReportSources,
    pub registry: Option<RegistryRecord>,
    pub address: Option<AddressRecord>,
    pub derived: DerivedSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportInput {
    pub document: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
}

/// Per-source provenance; `not_queried` and `ok` with no data are distinct outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSources {
    pub primary_registry: SourceStatus,
    pub secondary_registry: SourceStatus,
    pub postal_lookup: SourceStatus,
    pub sanctions_debarment: SourceStatus,
    pub sanctions_corporate_penalty: SourceStatus,
    pub sanctions_nonprofit_impediment: SourceStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivedSummary {
    pub company_summary: Option<CompanySummary>,
    pub ownership_roster: Vec<Partner>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanySummary {
    pub legal_name: String,
    pub trade_name: String,
    pub registration_status: String,
    pub founding_date: String,
    pub capital: f64,
    pub size_class: String,
    pub legal_nature: String,
}

impl CompanySummary {
    pub fn from_record(record: &RegistryRecord) -> Self {
        Self {
            legal_name: record.legal_name.clone(),
            trade_name: record.trade_name.clone(),
            registration_status: record.registration_status.clone(),
            founding_date: record.founding_date.clone(),
            capital: record.capital,
            size_class: record.size_class.clone(),
            legal_nature: record.legal_nature.clone(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        [self.legal_name.as_str(), self.trade_name.as_str()]
            .into_iter()
            .find(|name| !name.trim().is_empty())
    }
}
