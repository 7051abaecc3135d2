use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{Document, DocumentKind};
use crate::risk::{is_active_status, AggregationResult, RiskLevel};

/// Watch status: organizations are graded by registration, persons by sanctions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitoringStatus {
    Active,
    Inactive,
    Unknown,
    Regular,
    Irregular,
}

impl MonitoringStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MonitoringStatus::Active => "ACTIVE",
            MonitoringStatus::Inactive => "INACTIVE",
            MonitoringStatus::Unknown => "UNKNOWN",
            MonitoringStatus::Regular => "REGULAR",
            MonitoringStatus::Irregular => "IRREGULAR",
        }
    }
}

impl fmt::Display for MonitoringStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn compute_status(result: &AggregationResult) -> MonitoringStatus {
    match result.kind {
        DocumentKind::Organization => {
            let status = result.registration_status().trim();
            if is_active_status(status) {
                MonitoringStatus::Active
            } else if status.is_empty() {
                MonitoringStatus::Unknown
            } else {
                MonitoringStatus::Inactive
            }
        }
        DocumentKind::Person if result.sanctions_total() > 0 => MonitoringStatus::Irregular,
        DocumentKind::Person => MonitoringStatus::Regular,
    }
}

/// Latest check stored on an entry together with caller-owned fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSnapshot {
    pub aggregation: AggregationResult,
    #[serde(default)]
    pub entity_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub restriction_count: usize,
    pub last_check_at: DateTime<Utc>,
    #[serde(default)]
    pub has_changes: bool,
}

impl MonitoringSnapshot {
    pub fn initial(aggregation: AggregationResult, notes: Option<String>) -> Self {
        Self {
            entity_name: aggregation.registry_name().map(str::to_string),
            restriction_count: aggregation.sanctions_total(),
            last_check_at: aggregation.checked_at,
            has_changes: false,
            notes,
            aggregation,
        }
    }

    /// Next snapshot: notes carry over and a missing registry name keeps the previous one.
    pub fn recheck(&self, aggregation: AggregationResult) -> Self {
        let restriction_count = aggregation.sanctions_total();
        let entity_name = aggregation
            .registry_name()
            .map(str::to_string)
            .or_else(|| self.entity_name.clone());

        Self {
            entity_name,
            notes: self.notes.clone(),
            has_changes: restriction_count != self.restriction_count,
            restriction_count,
            last_check_at: aggregation.checked_at,
            aggregation,
        }
    }
}

/// Tenant-scoped watch registration for one identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringEntry {
    pub id: Uuid,
    pub tenant_id: String,
    pub document: String,
    pub kind: DocumentKind,
    pub status: MonitoringStatus,
    pub snapshot: MonitoringSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MonitoringEntry {
    pub fn new(tenant_id: &str, snapshot: MonitoringSnapshot) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            document: snapshot.aggregation.document.clone(),
            kind: snapshot.aggregation.kind,
            status: compute_status(&snapshot.aggregation),
            snapshot,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn replace_snapshot(&mut self, snapshot: MonitoringSnapshot) {
        self.status = compute_status(&snapshot.aggregation);
        self.snapshot = snapshot;
        self.updated_at = Utc::now();
    }

    /// Display fields derived from the snapshot rather than the stored columns.
    pub fn view(&self) -> MonitoringView {
        let aggregation = &self.snapshot.aggregation;
        let entity_name = self
            .snapshot
            .entity_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| aggregation.registry_name().map(str::to_string))
            .unwrap_or_else(|| {
                Document {
                    kind: aggregation.kind,
                    clean: self.document.clone(),
                }
                .placeholder_name()
            });

        MonitoringView {
            id: self.id,
            document: self.document.clone(),
            document_type: aggregation.kind,
            entity_name,
            notes: self.snapshot.notes.clone(),
            status: compute_status(aggregation),
            risk_level: aggregation.risk_level(),
            restriction_count: self.snapshot.restriction_count,
            has_restrictions: self.snapshot.restriction_count > 0,
            has_changes: self.snapshot.has_changes,
            last_check: self.snapshot.last_check_at,
            added_date: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringView {
    pub id: Uuid,
    pub document: String,
    pub document_type: DocumentKind,
    pub entity_name: String,
    pub notes: Option<String>,
    pub status: MonitoringStatus,
    pub risk_level: RiskLevel,
    pub restriction_count: usize,
    pub has_restrictions: bool,
    pub has_changes: bool,
    pub last_check: DateTime<Utc>,
    pub added_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddOutcome {
    pub entry: MonitoringEntry,
    pub already_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    pub document: String,
    pub old_restrictions: usize,
    pub new_restrictions: usize,
    pub has_changes: bool,
    pub status: MonitoringStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateAllReport {
    pub total: usize,
    pub updated: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountByType {
    #[serde(rename = "CPF")]
    pub person: usize,
    #[serde(rename = "CNPJ")]
    pub organization: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitoringStats {
    pub total_monitored: usize,
    pub with_restrictions: usize,
    pub active: usize,
    pub inactive: usize,
    pub by_type: CountByType,
    pub last_update: Option<DateTime<Utc>>,
}

impl MonitoringStats {
    pub fn from_entries(entries: &[MonitoringEntry]) -> Self {
        let mut stats = Self {
            total_monitored: entries.len(),
            ..Self::default()
        };

        for entry in entries {
            let snapshot = &entry.snapshot;
            if snapshot.restriction_count > 0 {
                stats.with_restrictions += 1;
            }
            if compute_status(&snapshot.aggregation) == MonitoringStatus::Active {
                stats.active += 1;
            }
            match snapshot.aggregation.kind {
                DocumentKind::Person => stats.by_type.person += 1,
                DocumentKind::Organization => stats.by_type.organization += 1,
            }
            if stats
                .last_update
                .map_or(true, |latest| snapshot.last_check_at > latest)
            {
                stats.last_update = Some(snapshot.last_check_at);
            }
        }

        stats.inactive = stats.total_monitored - stats.active;
        stats
    }
}
