use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{Decision, Dossier, DossierId, DossierSummary};
use super::repository::DossierRepository;
use crate::auth::TenantContext;
use crate::document::{digits_only, DocumentError};
use crate::narrative::NarrativeWriter;
use crate::risk::{RiskAggregator, RiskLevel};
use crate::store::{Page, PageRequest, RepositoryError};

pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(2);

/// Input for a single dossier run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateDossier {
    pub document: String,
    #[serde(default)]
    pub enable_ai: bool,
    #[serde(default)]
    pub cep: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DecisionRequest {
    #[serde(rename = "parecer_tecnico")]
    pub opinion: String,
    #[serde(rename = "aprovado")]
    pub approved: bool,
    #[serde(rename = "justificativa", default)]
    pub justification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchItemOutcome {
    Created {
        dossier_id: DossierId,
        entity_name: String,
        risk_level: RiskLevel,
    },
    Failed {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        existing_id: Option<DossierId>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    pub document: String,
    #[serde(flatten)]
    pub outcome: BatchItemOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    fn push(&mut self, item: BatchItem) {
        match item.outcome {
            BatchItemOutcome::Created { .. } => self.success_count += 1,
            BatchItemOutcome::Failed { .. } => self.error_count += 1,
        }
        self.items.push(item);
    }
}

/// Builds, persists, and decides dossiers.
pub struct DossierService<R> {
    repository: Arc<R>,
    aggregator: RiskAggregator,
    narrative: NarrativeWriter,
    batch_delay: Duration,
}

impl<R> DossierService<R>
where
    R: DossierRepository + 'static,
{
    pub fn new(repository: Arc<R>, aggregator: RiskAggregator, narrative: NarrativeWriter) -> Self {
        Self {
            repository,
            aggregator,
            narrative,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// Runs one check and stores the resulting dossier.
    pub async fn create(
        &self,
        tenant_id: &str,
        request: CreateDossier,
    ) -> Result<DossierSummary, DossierServiceError> {
        let result = self
            .aggregator
            .check(&request.document, request.cep.as_deref())
            .await
            .map_err(DossierServiceError::AggregationFailed)?;

        let narrative = if request.enable_ai {
            Some(self.narrative.write(&result).await)
        } else {
            None
        };

        let dossier = Dossier::from_aggregation(tenant_id, &result, narrative);
        let stored = self.repository.insert(dossier).await?;

        info!(
            tenant = tenant_id,
            dossier = %stored.id,
            document = %stored.document,
            risk = %stored.risk_level,
            "dossier created"
        );
        Ok(stored.summary())
    }

    pub async fn list(
        &self,
        tenant_id: &str,
        page: PageRequest,
    ) -> Result<Page<Dossier>, DossierServiceError> {
        let page = self.repository.list(tenant_id, page).await?;
        Ok(page.map(Dossier::with_display_name))
    }

    pub async fn get(&self, tenant_id: &str, id: &DossierId) -> Result<Dossier, DossierServiceError> {
        let dossier = self
            .repository
            .fetch(tenant_id, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(dossier.with_display_name())
    }

    /// Existing dossier id for the digits of `document`, if any.
    pub async fn check_duplicate(
        &self,
        tenant_id: &str,
        document: &str,
    ) -> Result<Option<DossierId>, DossierServiceError> {
        let clean = digits_only(document);
        if clean.is_empty() {
            return Ok(None);
        }
        Ok(self.repository.find_by_document(tenant_id, &clean).await?)
    }

    pub async fn record_decision(
        &self,
        tenant: &TenantContext,
        id: &DossierId,
        request: DecisionRequest,
    ) -> Result<Dossier, DossierServiceError> {
        let decision = Decision {
            opinion: request.opinion,
            approved: request.approved,
            justification: request
                .justification
                .filter(|justification| !justification.trim().is_empty()),
            decided_by: tenant.user_id.clone(),
            decided_at: Utc::now(),
        };

        let dossier = self
            .repository
            .record_decision(&tenant.tenant_id, id, decision)
            .await?;

        info!(
            tenant = %tenant.tenant_id,
            dossier = %dossier.id,
            status = dossier.decision_status.label(),
            "dossier decision recorded"
        );
        Ok(dossier.with_display_name())
    }

    /// Sequential batch run with a fixed pause between upstream queries; never aborts early.
    ///
    /// Items skipped as duplicates make no upstream call and are not followed by a pause.
    pub async fn process_batch(
        &self,
        tenant_id: &str,
        documents: Vec<String>,
        enable_ai: bool,
    ) -> BatchReport {
        let mut report = BatchReport {
            total: documents.len(),
            ..BatchReport::default()
        };

        let mut queried = false;
        for document in documents {
            let outcome = match self.batch_duplicate(tenant_id, &document).await {
                Some(skipped) => skipped,
                None => {
                    if queried && !self.batch_delay.is_zero() {
                        tokio::time::sleep(self.batch_delay).await;
                    }
                    queried = true;
                    self.create_batch_item(tenant_id, &document, enable_ai).await
                }
            };
            if let BatchItemOutcome::Failed { error, .. } = &outcome {
                warn!(tenant = tenant_id, document = %document, error = %error, "batch item failed");
            }
            report.push(BatchItem { document, outcome });
        }

        info!(
            tenant = tenant_id,
            total = report.total,
            succeeded = report.success_count,
            failed = report.error_count,
            "batch finished"
        );
        report
    }

    /// Outcome for an item that must not be queried again, if any.
    async fn batch_duplicate(&self, tenant_id: &str, document: &str) -> Option<BatchItemOutcome> {
        match self.check_duplicate(tenant_id, document).await {
            Ok(Some(existing)) => Some(BatchItemOutcome::Failed {
                error: "dossier already exists".to_string(),
                existing_id: Some(existing),
            }),
            Ok(None) => None,
            Err(err) => Some(BatchItemOutcome::Failed {
                error: err.to_string(),
                existing_id: None,
            }),
        }
    }

    async fn create_batch_item(
        &self,
        tenant_id: &str,
        document: &str,
        enable_ai: bool,
    ) -> BatchItemOutcome {
        let request = CreateDossier {
            document: document.to_string(),
            enable_ai,
            cep: None,
        };
        match self.create(tenant_id, request).await {
            Ok(summary) => BatchItemOutcome::Created {
                dossier_id: summary.dossier_id,
                entity_name: summary.entity_name,
                risk_level: summary.risk_level,
            },
            Err(err) => BatchItemOutcome::Failed {
                error: err.to_string(),
                existing_id: None,
            },
        }
    }
}

/// Error raised by the dossier service.
#[derive(Debug, thiserror::Error)]
pub enum DossierServiceError {
    #[error("aggregation failed: {0}")]
    AggregationFailed(DocumentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
