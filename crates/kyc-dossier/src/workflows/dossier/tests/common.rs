use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;

use crate::store::{MemoryDossierRepository, Page, PageRequest, RepositoryError};
use crate::workflows::dossier::{
    dossier_router, Decision, Dossier, DossierId, DossierRepository, DossierService,
};
use crate::workflows::testing::{authenticated, Upstreams};

pub(super) use crate::workflows::testing::{
    empty_request, json_request, read_json_body, COMPANY, COMPANY_DIGITS, PERSON, PERSON_DIGITS,
};

pub(super) struct Harness {
    pub(super) service: Arc<DossierService<MemoryDossierRepository>>,
    pub(super) repository: Arc<MemoryDossierRepository>,
    pub(super) upstreams: Upstreams,
}

pub(super) fn build_service() -> Harness {
    build_service_with_delay(Duration::ZERO)
}

pub(super) fn build_service_with_delay(batch_delay: Duration) -> Harness {
    let upstreams = Upstreams::new();
    let repository = Arc::new(MemoryDossierRepository::default());
    let service = DossierService::new(
        repository.clone(),
        upstreams.aggregator(),
        upstreams.narrative_writer(),
    )
    .with_batch_delay(batch_delay);

    Harness {
        service: Arc::new(service),
        repository,
        upstreams,
    }
}

pub(super) fn router_for<R>(service: Arc<DossierService<R>>) -> Router
where
    R: DossierRepository + 'static,
{
    authenticated(dossier_router(service))
}

/// Repository whose backend is always down.
pub(super) struct UnavailableRepository;

fn down() -> RepositoryError {
    RepositoryError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl DossierRepository for UnavailableRepository {
    async fn insert(&self, _dossier: Dossier) -> Result<Dossier, RepositoryError> {
        Err(down())
    }

    async fn fetch(
        &self,
        _tenant_id: &str,
        _id: &DossierId,
    ) -> Result<Option<Dossier>, RepositoryError> {
        Err(down())
    }

    async fn list(
        &self,
        _tenant_id: &str,
        _page: PageRequest,
    ) -> Result<Page<Dossier>, RepositoryError> {
        Err(down())
    }

    async fn find_by_document(
        &self,
        _tenant_id: &str,
        _document: &str,
    ) -> Result<Option<DossierId>, RepositoryError> {
        Err(down())
    }

    async fn record_decision(
        &self,
        _tenant_id: &str,
        _id: &DossierId,
        _decision: Decision,
    ) -> Result<Dossier, RepositoryError> {
        Err(down())
    }
}

pub(super) fn unavailable_service() -> Arc<DossierService<UnavailableRepository>> {
    let upstreams = Upstreams::new();
    Arc::new(DossierService::new(
        Arc::new(UnavailableRepository),
        upstreams.aggregator(),
        upstreams.narrative_writer(),
    ))
}
