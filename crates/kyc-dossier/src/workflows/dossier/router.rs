use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::DossierId;
use super::repository::DossierRepository;
use super::service::{CreateDossier, DecisionRequest, DossierService, DossierServiceError};
use crate::auth::TenantContext;
use crate::store::{PageRequest, RepositoryError};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    page: Option<u32>,
    page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DuplicateQuery {
    document: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchRequest {
    documents: Vec<String>,
    #[serde(default)]
    enable_ai: bool,
}

/// Router builder exposing dossier creation, listing, and decisions.
pub fn dossier_router<R>(service: Arc<DossierService<R>>) -> Router
where
    R: DossierRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/dossiers",
            post(create_handler::<R>).get(list_handler::<R>),
        )
        .route("/api/v1/dossiers/batch", post(batch_handler::<R>))
        .route(
            "/api/v1/dossiers/check-duplicate",
            get(check_duplicate_handler::<R>),
        )
        .route("/api/v1/dossiers/:dossier_id", get(get_handler::<R>))
        .route(
            "/api/v1/dossiers/:dossier_id/decide",
            put(decide_handler::<R>),
        )
        .with_state(service)
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    let payload = json!({
        "success": false,
        "error": message.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "dossier not found")
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<DossierService<R>>>,
    tenant: TenantContext,
    axum::Json(request): axum::Json<CreateDossier>,
) -> Response
where
    R: DossierRepository + 'static,
{
    match service.create(&tenant.tenant_id, request).await {
        Ok(summary) => {
            let payload = json!({
                "success": true,
                "dossier_id": summary.dossier_id,
                "entity_name": summary.entity_name,
                "risk_level": summary.risk_level,
                "document": summary.document,
                "doc_type": summary.doc_type,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(StatusCode::BAD_REQUEST, err),
    }
}

pub(crate) async fn batch_handler<R>(
    State(service): State<Arc<DossierService<R>>>,
    tenant: TenantContext,
    axum::Json(request): axum::Json<BatchRequest>,
) -> Response
where
    R: DossierRepository + 'static,
{
    let total = request.documents.len();
    let tenant_id = tenant.tenant_id;
    let worker = service.clone();
    tokio::spawn(async move {
        worker
            .process_batch(&tenant_id, request.documents, request.enable_ai)
            .await;
    });

    let payload = json!({
        "success": true,
        "message": format!("processing started for {total} document(s)"),
        "total": total,
        "status": "processing",
    });
    (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<DossierService<R>>>,
    tenant: TenantContext,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: DossierRepository + 'static,
{
    let page = PageRequest::new(query.page, query.page_size);
    match service.list(&tenant.tenant_id, page).await {
        Ok(page) => (StatusCode::OK, axum::Json(page)).into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err),
    }
}

pub(crate) async fn check_duplicate_handler<R>(
    State(service): State<Arc<DossierService<R>>>,
    tenant: TenantContext,
    Query(query): Query<DuplicateQuery>,
) -> Response
where
    R: DossierRepository + 'static,
{
    match service
        .check_duplicate(&tenant.tenant_id, &query.document)
        .await
    {
        Ok(existing) => {
            let payload = json!({
                "exists": existing.is_some(),
                "dossier_id": existing,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err),
    }
}

pub(crate) async fn get_handler<R>(
    State(service): State<Arc<DossierService<R>>>,
    tenant: TenantContext,
    Path(dossier_id): Path<String>,
) -> Response
where
    R: DossierRepository + 'static,
{
    let Some(id) = DossierId::parse(&dossier_id) else {
        return not_found();
    };

    match service.get(&tenant.tenant_id, &id).await {
        Ok(dossier) => (StatusCode::OK, axum::Json(dossier)).into_response(),
        Err(DossierServiceError::Repository(RepositoryError::NotFound)) => not_found(),
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, other),
    }
}

pub(crate) async fn decide_handler<R>(
    State(service): State<Arc<DossierService<R>>>,
    tenant: TenantContext,
    Path(dossier_id): Path<String>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    R: DossierRepository + 'static,
{
    let Some(id) = DossierId::parse(&dossier_id) else {
        return not_found();
    };

    match service.record_decision(&tenant, &id, request).await {
        Ok(dossier) => {
            let payload = json!({
                "success": true,
                "message": "decision recorded",
                "decision_status": dossier.decision_status,
                "decided_at": dossier.decided_at,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(DossierServiceError::Repository(RepositoryError::NotFound)) => not_found(),
        Err(other) => error_response(StatusCode::BAD_REQUEST, other),
    }
}
