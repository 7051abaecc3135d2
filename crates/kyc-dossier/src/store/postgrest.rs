//! PostgREST-compatible REST store (Supabase and friends).
//!
//! Rows mirror the serialized domain types, with nested reports and snapshots kept in `jsonb`
//! columns. Every query carries an explicit `tenant_id=eq.<id>` filter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_RANGE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{Page, PageRequest, RepositoryError};
use crate::document::DocumentKind;
use crate::workflows::dossier::{Decision, DecisionStatus, Dossier, DossierId, DossierRepository};
use crate::workflows::monitoring::{MonitoringEntry, MonitoringRepository};

const TIMEOUT: Duration = Duration::from_secs(15);
pub const DOSSIER_TABLE: &str = "dossiers";
pub const MONITORING_TABLE: &str = "monitoring_targets";

type Filters<'a> = &'a [(&'a str, String)];

fn eq(value: impl AsRef<str>) -> String {
    format!("eq.{}", value.as_ref())
}

/// Total from a `Content-Range: 0-9/42` header; `*` totals are unknown.
pub fn parse_content_range(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_RANGE)?
        .to_str()
        .ok()?
        .rsplit('/')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Thin table client speaking the PostgREST query dialect.
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), table);
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .timeout(TIMEOUT)
    }

    async fn send(&self, table: &str, request: RequestBuilder) -> Result<Response, RepositoryError> {
        let response = request
            .send()
            .await
            .map_err(|err| RepositoryError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(RepositoryError::Conflict);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Unavailable(format!(
                "{table} returned status {}: {body}",
                status.as_u16()
            )));
        }
        Ok(response)
    }

    async fn rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, RepositoryError> {
        response
            .json::<Vec<T>>()
            .await
            .map_err(|err| RepositoryError::Unavailable(format!("unreadable rows: {err}")))
    }

    /// Ordered select with optional window; the total is requested with `Prefer: count=exact`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: Filters<'_>,
        order: Option<&str>,
        window: Option<PageRequest>,
    ) -> Result<(Vec<T>, Option<usize>), RepositoryError> {
        let mut query: Vec<(&str, String)> = vec![("select", "*".to_string())];
        query.extend(filters.iter().cloned());
        if let Some(order) = order {
            query.push(("order", order.to_string()));
        }
        if let Some(window) = window {
            query.push(("offset", window.offset().to_string()));
            query.push(("limit", window.limit().to_string()));
        }

        let request = self
            .request(Method::GET, table)
            .query(&query)
            .header("Prefer", "count=exact");
        let response = self.send(table, request).await?;
        let total = parse_content_range(response.headers());
        let rows = Self::rows(response).await?;
        debug!(table, rows = rows.len(), ?total, "store select");
        Ok((rows, total))
    }

    pub async fn insert<T: Serialize + DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<T, RepositoryError> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(row);
        let response = self.send(table, request).await?;
        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::Unavailable(format!("{table} insert returned no row")))
    }

    /// Patches matching rows and returns them; an empty result means nothing matched.
    pub async fn update<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: Filters<'_>,
        patch: &Value,
    ) -> Result<Vec<T>, RepositoryError> {
        let request = self
            .request(Method::PATCH, table)
            .query(filters)
            .header("Prefer", "return=representation")
            .json(patch);
        let response = self.send(table, request).await?;
        Self::rows(response).await
    }

    /// Deletes matching rows and returns how many were removed.
    pub async fn delete(&self, table: &str, filters: Filters<'_>) -> Result<usize, RepositoryError> {
        let request = self
            .request(Method::DELETE, table)
            .query(filters)
            .header("Prefer", "return=representation");
        let response = self.send(table, request).await?;
        Ok(Self::rows::<Value>(response).await?.len())
    }
}

#[derive(Debug, Clone)]
pub struct PostgrestDossierRepository {
    client: PostgrestClient,
}

impl PostgrestDossierRepository {
    pub fn new(client: PostgrestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DossierRepository for PostgrestDossierRepository {
    async fn insert(&self, dossier: Dossier) -> Result<Dossier, RepositoryError> {
        self.client.insert(DOSSIER_TABLE, &dossier).await
    }

    async fn fetch(
        &self,
        tenant_id: &str,
        id: &DossierId,
    ) -> Result<Option<Dossier>, RepositoryError> {
        let filters = [("id", eq(id.to_string())), ("tenant_id", eq(tenant_id))];
        let (rows, _) = self
            .client
            .select::<Dossier>(DOSSIER_TABLE, &filters, None, None)
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list(&self, tenant_id: &str, page: PageRequest) -> Result<Page<Dossier>, RepositoryError> {
        let filters = [("tenant_id", eq(tenant_id))];
        let (rows, total) = self
            .client
            .select::<Dossier>(DOSSIER_TABLE, &filters, Some("created_at.desc"), Some(page))
            .await?;
        let total = total.unwrap_or(page.offset() + rows.len());
        Ok(Page::new(rows, total, page))
    }

    async fn find_by_document(
        &self,
        tenant_id: &str,
        document: &str,
    ) -> Result<Option<DossierId>, RepositoryError> {
        let filters = [("tenant_id", eq(tenant_id)), ("document", eq(document))];
        let window = PageRequest {
            page: 1,
            page_size: 1,
        };
        let (rows, _) = self
            .client
            .select::<Dossier>(DOSSIER_TABLE, &filters, Some("created_at.desc"), Some(window))
            .await?;
        Ok(rows.into_iter().next().map(|dossier| dossier.id))
    }

    async fn record_decision(
        &self,
        tenant_id: &str,
        id: &DossierId,
        decision: Decision,
    ) -> Result<Dossier, RepositoryError> {
        let filters = [("id", eq(id.to_string())), ("tenant_id", eq(tenant_id))];
        let patch = json!({
            "decision_status": DecisionStatus::from_approval(decision.approved),
            "approved": decision.approved,
            "compliance_opinion": decision.opinion,
            "rejection_justification": decision.justification,
            "decided_at": decision.decided_at,
            "decided_by": decision.decided_by,
        });
        self.client
            .update::<Dossier>(DOSSIER_TABLE, &filters, &patch)
            .await?
            .into_iter()
            .next()
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Debug, Clone)]
pub struct PostgrestMonitoringRepository {
    client: PostgrestClient,
}

impl PostgrestMonitoringRepository {
    pub fn new(client: PostgrestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MonitoringRepository for PostgrestMonitoringRepository {
    async fn find(
        &self,
        tenant_id: &str,
        document: &str,
    ) -> Result<Option<MonitoringEntry>, RepositoryError> {
        let filters = [("tenant_id", eq(tenant_id)), ("document", eq(document))];
        let (rows, _) = self
            .client
            .select::<MonitoringEntry>(MONITORING_TABLE, &filters, None, None)
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, entry: MonitoringEntry) -> Result<MonitoringEntry, RepositoryError> {
        self.client.insert(MONITORING_TABLE, &entry).await
    }

    async fn update(&self, entry: MonitoringEntry) -> Result<MonitoringEntry, RepositoryError> {
        let filters = [
            ("tenant_id", eq(&entry.tenant_id)),
            ("document", eq(&entry.document)),
        ];
        let patch = json!({
            "status": entry.status,
            "snapshot": entry.snapshot,
            "updated_at": entry.updated_at,
        });
        self.client
            .update::<MonitoringEntry>(MONITORING_TABLE, &filters, &patch)
            .await?
            .into_iter()
            .next()
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, tenant_id: &str, document: &str) -> Result<bool, RepositoryError> {
        let filters = [("tenant_id", eq(tenant_id)), ("document", eq(document))];
        Ok(self.client.delete(MONITORING_TABLE, &filters).await? > 0)
    }

    async fn list(
        &self,
        tenant_id: &str,
        kind: Option<DocumentKind>,
        page: PageRequest,
    ) -> Result<Page<MonitoringEntry>, RepositoryError> {
        let mut filters = vec![("tenant_id", eq(tenant_id))];
        if let Some(kind) = kind {
            filters.push(("kind", eq(kind.label())));
        }
        let (rows, total) = self
            .client
            .select::<MonitoringEntry>(
                MONITORING_TABLE,
                &filters,
                Some("created_at.desc"),
                Some(page),
            )
            .await?;
        let total = total.unwrap_or(page.offset() + rows.len());
        Ok(Page::new(rows, total, page))
    }

    async fn all(&self, tenant_id: &str) -> Result<Vec<MonitoringEntry>, RepositoryError> {
        let filters = [("tenant_id", eq(tenant_id))];
        let (rows, _) = self
            .client
            .select::<MonitoringEntry>(MONITORING_TABLE, &filters, Some("created_at.desc"), None)
            .await?;
        Ok(rows)
    }
}
