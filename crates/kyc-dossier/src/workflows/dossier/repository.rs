use async_trait::async_trait;

use super::domain::{Decision, Dossier, DossierId};
use crate::store::{Page, PageRequest, RepositoryError};

/// Tenant-scoped dossier storage. Every method filters on `tenant_id`.
#[async_trait]
pub trait DossierRepository: Send + Sync {
    async fn insert(&self, dossier: Dossier) -> Result<Dossier, RepositoryError>;

    async fn fetch(&self, tenant_id: &str, id: &DossierId)
        -> Result<Option<Dossier>, RepositoryError>;

    /// Newest first.
    async fn list(&self, tenant_id: &str, page: PageRequest) -> Result<Page<Dossier>, RepositoryError>;

    async fn find_by_document(
        &self,
        tenant_id: &str,
        document: &str,
    ) -> Result<Option<DossierId>, RepositoryError>;

    /// Fails with [`RepositoryError::NotFound`] when no row matches `(tenant_id, id)`.
    async fn record_decision(
        &self,
        tenant_id: &str,
        id: &DossierId,
        decision: Decision,
    ) -> Result<Dossier, RepositoryError>;
}
