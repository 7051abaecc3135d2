use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;

use crate::document::DocumentKind;
use crate::store::{MemoryMonitoringRepository, Page, PageRequest, RepositoryError};
use crate::workflows::monitoring::{monitoring_router, MonitoringEntry, MonitoringRepository, MonitoringService};
use crate::workflows::testing::{authenticated, Upstreams};

pub(super) use crate::workflows::testing::{
    empty_request, json_request, read_json_body, COMPANY, COMPANY_DIGITS, PERSON, PERSON_DIGITS,
};

/// Memory repository that records every write it receives.
#[derive(Default)]
pub(super) struct CountingRepository {
    inner: MemoryMonitoringRepository,
    writes: Mutex<Vec<&'static str>>,
}

impl CountingRepository {
    pub(super) fn writes(&self) -> Vec<&'static str> {
        self.writes.lock().expect("writes mutex").clone()
    }

    fn record(&self, operation: &'static str) {
        self.writes.lock().expect("writes mutex").push(operation);
    }
}

#[async_trait]
impl MonitoringRepository for CountingRepository {
    async fn find(
        &self,
        tenant_id: &str,
        document: &str,
    ) -> Result<Option<MonitoringEntry>, RepositoryError> {
        self.inner.find(tenant_id, document).await
    }

    async fn insert(&self, entry: MonitoringEntry) -> Result<MonitoringEntry, RepositoryError> {
        self.record("insert");
        self.inner.insert(entry).await
    }

    async fn update(&self, entry: MonitoringEntry) -> Result<MonitoringEntry, RepositoryError> {
        self.record("update");
        self.inner.update(entry).await
    }

    async fn delete(&self, tenant_id: &str, document: &str) -> Result<bool, RepositoryError> {
        self.record("delete");
        self.inner.delete(tenant_id, document).await
    }

    async fn list(
        &self,
        tenant_id: &str,
        kind: Option<DocumentKind>,
        page: PageRequest,
    ) -> Result<Page<MonitoringEntry>, RepositoryError> {
        self.inner.list(tenant_id, kind, page).await
    }

    async fn all(&self, tenant_id: &str) -> Result<Vec<MonitoringEntry>, RepositoryError> {
        self.inner.all(tenant_id).await
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<MonitoringService<CountingRepository>>,
    pub(super) repository: Arc<CountingRepository>,
    pub(super) upstreams: Upstreams,
}

pub(super) fn build_service() -> Harness {
    let upstreams = Upstreams::new();
    let repository = Arc::new(CountingRepository::default());
    let service = MonitoringService::new(repository.clone(), upstreams.aggregator());

    Harness {
        service: Arc::new(service),
        repository,
        upstreams,
    }
}

pub(super) fn router_for(service: Arc<MonitoringService<CountingRepository>>) -> Router {
    authenticated(monitoring_router(service))
}
