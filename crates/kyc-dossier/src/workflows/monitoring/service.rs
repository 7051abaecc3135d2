use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::domain::{
    AddOutcome, MonitoringEntry, MonitoringSnapshot, MonitoringStats, MonitoringView,
    UpdateAllReport, UpdateOutcome,
};
use super::repository::MonitoringRepository;
use crate::document::{classify, digits_only, Document, DocumentError, DocumentKind};
use crate::risk::RiskAggregator;
use crate::store::{Page, PageRequest, RepositoryError};

pub const DEFAULT_CHANGE_WINDOW_DAYS: i64 = 2;

/// Watchlist maintenance and change detection across re-checks.
pub struct MonitoringService<R> {
    repository: Arc<R>,
    aggregator: RiskAggregator,
}

impl<R> MonitoringService<R>
where
    R: MonitoringRepository + 'static,
{
    pub fn new(repository: Arc<R>, aggregator: RiskAggregator) -> Self {
        Self {
            repository,
            aggregator,
        }
    }

    /// Idempotent: an already watched identifier is returned untouched.
    pub async fn add(
        &self,
        tenant_id: &str,
        document: &str,
        notes: Option<String>,
    ) -> Result<AddOutcome, MonitoringServiceError> {
        let document = classify(document)?;

        if let Some(entry) = self.repository.find(tenant_id, &document.clean).await? {
            return Ok(AddOutcome {
                entry,
                already_exists: true,
            });
        }

        let aggregation = self.aggregator.aggregate(&document, None).await;
        let notes = notes.filter(|notes| !notes.trim().is_empty());
        let entry = MonitoringEntry::new(tenant_id, MonitoringSnapshot::initial(aggregation, notes));

        match self.repository.insert(entry).await {
            Ok(entry) => {
                info!(
                    tenant = tenant_id,
                    document = %entry.document,
                    status = %entry.status,
                    "monitoring entry added"
                );
                Ok(AddOutcome {
                    entry,
                    already_exists: false,
                })
            }
            Err(RepositoryError::Conflict) => {
                let entry = self
                    .repository
                    .find(tenant_id, &document.clean)
                    .await?
                    .ok_or(RepositoryError::Conflict)?;
                Ok(AddOutcome {
                    entry,
                    already_exists: true,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Re-runs the check; a missing entry fails before any lookup or write.
    pub async fn update(
        &self,
        tenant_id: &str,
        document: &str,
    ) -> Result<UpdateOutcome, MonitoringServiceError> {
        let clean = digits_only(document);
        let mut entry = self
            .repository
            .find(tenant_id, &clean)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let target = Document {
            kind: entry.kind,
            clean: entry.document.clone(),
        };
        let aggregation = self.aggregator.aggregate(&target, None).await;
        let old_restrictions = entry.snapshot.restriction_count;
        let snapshot = entry.snapshot.recheck(aggregation);
        entry.replace_snapshot(snapshot);

        let entry = self.repository.update(entry).await?;
        let outcome = UpdateOutcome {
            document: entry.document.clone(),
            old_restrictions,
            new_restrictions: entry.snapshot.restriction_count,
            has_changes: entry.snapshot.has_changes,
            status: entry.status,
        };

        info!(
            tenant = tenant_id,
            document = %outcome.document,
            old = outcome.old_restrictions,
            new = outcome.new_restrictions,
            changed = outcome.has_changes,
            "monitoring entry rechecked"
        );
        Ok(outcome)
    }

    /// Sequential re-check of every entry; individual failures are counted, not raised.
    pub async fn update_all(&self, tenant_id: &str) -> Result<UpdateAllReport, MonitoringServiceError> {
        let entries = self.repository.all(tenant_id).await?;
        let mut report = UpdateAllReport {
            total: entries.len(),
            ..UpdateAllReport::default()
        };

        for entry in entries {
            match self.update(tenant_id, &entry.document).await {
                Ok(_) => report.updated += 1,
                Err(err) => {
                    warn!(tenant = tenant_id, document = %entry.document, error = %err, "recheck failed");
                    report.errors += 1;
                }
            }
        }

        info!(
            tenant = tenant_id,
            total = report.total,
            updated = report.updated,
            errors = report.errors,
            "monitoring recheck finished"
        );
        Ok(report)
    }

    pub async fn list(
        &self,
        tenant_id: &str,
        kind: Option<DocumentKind>,
        page: PageRequest,
    ) -> Result<Page<MonitoringView>, MonitoringServiceError> {
        let page = self.repository.list(tenant_id, kind, page).await?;
        Ok(page.map(|entry| entry.view()))
    }

    pub async fn stats(&self, tenant_id: &str) -> Result<MonitoringStats, MonitoringServiceError> {
        let entries = self.repository.all(tenant_id).await?;
        Ok(MonitoringStats::from_entries(&entries))
    }

    pub async fn remove(&self, tenant_id: &str, document: &str) -> Result<(), MonitoringServiceError> {
        let clean = digits_only(document);
        if !self.repository.delete(tenant_id, &clean).await? {
            return Err(RepositoryError::NotFound.into());
        }
        info!(tenant = tenant_id, document = %clean, "monitoring entry removed");
        Ok(())
    }

    /// Entries flagged as changed whose last check falls within the trailing `days`.
    pub async fn recent_changes(
        &self,
        tenant_id: &str,
        days: i64,
    ) -> Result<Vec<MonitoringView>, MonitoringServiceError> {
        self.recent_changes_since(tenant_id, window_start(Utc::now(), days))
            .await
    }

    pub async fn recent_changes_since(
        &self,
        tenant_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<MonitoringView>, MonitoringServiceError> {
        let entries = self.repository.all(tenant_id).await?;
        Ok(entries
            .iter()
            .filter(|entry| entry.snapshot.has_changes && entry.snapshot.last_check_at >= cutoff)
            .map(MonitoringEntry::view)
            .collect())
    }
}

/// Start of a trailing window of `days`; windows reaching past the
/// representable range cover all time.
fn window_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days.max(0))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Error raised by the monitoring service.
#[derive(Debug, thiserror::Error)]
pub enum MonitoringServiceError {
    #[error(transparent)]
    InvalidDocument(#[from] DocumentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
