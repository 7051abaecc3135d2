use async_trait::async_trait;

use super::domain::MonitoringEntry;
use crate::document::DocumentKind;
use crate::store::{Page, PageRequest, RepositoryError};

/// Watchlist storage keyed by `(tenant_id, document)`.
#[async_trait]
pub trait MonitoringRepository: Send + Sync {
    async fn find(
        &self,
        tenant_id: &str,
        document: &str,
    ) -> Result<Option<MonitoringEntry>, RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] when the pair is already watched.
    async fn insert(&self, entry: MonitoringEntry) -> Result<MonitoringEntry, RepositoryError>;

    /// Fails with [`RepositoryError::NotFound`] when the pair is not watched.
    async fn update(&self, entry: MonitoringEntry) -> Result<MonitoringEntry, RepositoryError>;

    /// Returns whether a row was removed.
    async fn delete(&self, tenant_id: &str, document: &str) -> Result<bool, RepositoryError>;

    /// Newest first, optionally restricted to one identifier kind.
    async fn list(
        &self,
        tenant_id: &str,
        kind: Option<DocumentKind>,
        page: PageRequest,
    ) -> Result<Page<MonitoringEntry>, RepositoryError>;

    /// Every entry of the tenant, newest first.
    async fn all(&self, tenant_id: &str) -> Result<Vec<MonitoringEntry>, RepositoryError>;
}
