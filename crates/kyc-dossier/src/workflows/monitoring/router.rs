use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::repository::MonitoringRepository;
use super::service::{MonitoringService, MonitoringServiceError, DEFAULT_CHANGE_WINDOW_DAYS};
use crate::auth::TenantContext;
use crate::document::DocumentKind;
use crate::store::{PageRequest, RepositoryError};

#[derive(Debug, Deserialize)]
pub(crate) struct AddRequest {
    document: String,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    page: Option<u32>,
    page_size: Option<u32>,
    doc_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChangesQuery {
    days: Option<i64>,
}

/// Router builder exposing the watchlist endpoints.
pub fn monitoring_router<R>(service: Arc<MonitoringService<R>>) -> Router
where
    R: MonitoringRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/monitoring",
            get(list_handler::<R>).post(add_handler::<R>),
        )
        .route("/api/v1/monitoring/stats", get(stats_handler::<R>))
        .route("/api/v1/monitoring/all", put(update_all_handler::<R>))
        .route(
            "/api/v1/monitoring/changes/recent",
            get(recent_changes_handler::<R>),
        )
        .route(
            "/api/v1/monitoring/:document",
            put(update_handler::<R>).delete(remove_handler::<R>),
        )
        .with_state(service)
}

fn error_response(err: MonitoringServiceError) -> Response {
    let status = match &err {
        MonitoringServiceError::InvalidDocument(_) => StatusCode::BAD_REQUEST,
        MonitoringServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        MonitoringServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        MonitoringServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let message = match &err {
        MonitoringServiceError::Repository(RepositoryError::NotFound) => {
            "monitoring entry not found".to_string()
        }
        other => other.to_string(),
    };
    let payload = json!({
        "success": false,
        "error": message,
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn add_handler<R>(
    State(service): State<Arc<MonitoringService<R>>>,
    tenant: TenantContext,
    axum::Json(request): axum::Json<AddRequest>,
) -> Response
where
    R: MonitoringRepository + 'static,
{
    match service
        .add(&tenant.tenant_id, &request.document, request.notes)
        .await
    {
        Ok(outcome) => {
            let view = outcome.entry.view();
            let payload = json!({
                "success": true,
                "record_id": outcome.entry.id,
                "document": view.document,
                "entity_name": view.entity_name,
                "restriction_count": view.restriction_count,
                "status": view.status,
                "already_exists": outcome.already_exists,
            });
            let status = if outcome.already_exists {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            (status, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<MonitoringService<R>>>,
    tenant: TenantContext,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: MonitoringRepository + 'static,
{
    let kind = match query.doc_type.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(label) => match DocumentKind::from_label(label) {
            Some(kind) => Some(kind),
            None => {
                let payload = json!({
                    "success": false,
                    "error": format!("unknown document type '{label}'"),
                });
                return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
            }
        },
    };

    let page = PageRequest::new(query.page, query.page_size);
    match service.list(&tenant.tenant_id, kind, page).await {
        Ok(page) => {
            let payload = json!({
                "success": true,
                "records": page.items,
                "total": page.total,
                "page": page.page,
                "page_size": page.page_size,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn stats_handler<R>(
    State(service): State<Arc<MonitoringService<R>>>,
    tenant: TenantContext,
) -> Response
where
    R: MonitoringRepository + 'static,
{
    match service.stats(&tenant.tenant_id).await {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<R>(
    State(service): State<Arc<MonitoringService<R>>>,
    tenant: TenantContext,
    Path(document): Path<String>,
) -> Response
where
    R: MonitoringRepository + 'static,
{
    match service.update(&tenant.tenant_id, &document).await {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_all_handler<R>(
    State(service): State<Arc<MonitoringService<R>>>,
    tenant: TenantContext,
) -> Response
where
    R: MonitoringRepository + 'static,
{
    match service.update_all(&tenant.tenant_id).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn remove_handler<R>(
    State(service): State<Arc<MonitoringService<R>>>,
    tenant: TenantContext,
    Path(document): Path<String>,
) -> Response
where
    R: MonitoringRepository + 'static,
{
    match service.remove(&tenant.tenant_id, &document).await {
        Ok(()) => {
            let payload = json!({
                "success": true,
                "message": "monitoring entry removed",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn recent_changes_handler<R>(
    State(service): State<Arc<MonitoringService<R>>>,
    tenant: TenantContext,
    Query(query): Query<ChangesQuery>,
) -> Response
where
    R: MonitoringRepository + 'static,
{
    let days = query.days.unwrap_or(DEFAULT_CHANGE_WINDOW_DAYS);
    match service.recent_changes(&tenant.tenant_id, days).await {
        Ok(changes) => {
            let payload = json!({
                "success": true,
                "total": changes.len(),
                "changes": changes,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}
