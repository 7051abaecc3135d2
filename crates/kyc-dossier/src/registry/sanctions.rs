use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::domain::{SanctionList, SanctionsRecord};
use super::{RegistryError, SanctionsRegistry};
use crate::document::{Document, DocumentKind};

const PROVIDER: &str = "sanctions api";
const TIMEOUT: Duration = Duration::from_secs(10);
const API_KEY_HEADER: &str = "chave-api-dados";

/// Query shape of one sanctions list.
#[derive(Debug, Clone, Copy)]
struct ListQuery {
    path: &'static str,
    person_param: Option<&'static str>,
    organization_param: Option<&'static str>,
    /// Fields naming the sanctioned party; an entry is kept when any equals the document.
    subject_fields: &'static [&'static str],
}

impl ListQuery {
    fn param(&self, kind: DocumentKind) -> Option<&'static str> {
        match kind {
            DocumentKind::Person => self.person_param,
            DocumentKind::Organization => self.organization_param,
        }
    }
}

const DEBARMENT: ListQuery = ListQuery {
    path: "ceis",
    person_param: Some("cpfCnpj"),
    organization_param: Some("codigoCpfCnpj"),
    subject_fields: &["cpfCnpjSancionado", "cnpjSancionado"],
};

const CORPORATE_PENALTY: ListQuery = ListQuery {
    path: "cnep",
    person_param: Some("cpf"),
    organization_param: Some("codigoCnpj"),
    subject_fields: &["cnpjCpfSancionado"],
};

const NONPROFIT_IMPEDIMENT: ListQuery = ListQuery {
    path: "cepim",
    person_param: None,
    organization_param: Some("cnpj"),
    subject_fields: &["cnpj"],
};

/// Client for the three public sanctions lists.
#[derive(Debug, Clone)]
pub struct SanctionsClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl SanctionsClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    async fn query_list(&self, query: ListQuery, document: &Document, api_key: &str) -> SanctionList {
        let Some(param) = query.param(document.kind) else {
            return SanctionList::not_queried();
        };

        match self.fetch(query, param, document, api_key).await {
            Ok(entries) => {
                let retained = retain_subject(entries, query.subject_fields, &document.clean);
                debug!(list = query.path, found = retained.len(), "sanctions list checked");
                SanctionList::found(retained)
            }
            Err(err) => {
                warn!(list = query.path, error = %err, "sanctions list unavailable; continuing");
                SanctionList::failed(err)
            }
        }
    }

    async fn fetch(
        &self,
        query: ListQuery,
        param: &str,
        document: &Document,
        api_key: &str,
    ) -> Result<Vec<Value>, RegistryError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), query.path);
        let response = self
            .http
            .get(&url)
            .query(&[(param, document.clean.as_str())])
            .header(API_KEY_HEADER, api_key)
            .timeout(TIMEOUT)
            .send()
            .await
            .map_err(|err| RegistryError::transport(PROVIDER, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Upstream {
                provider: PROVIDER,
                status: Some(status.as_u16()),
                detail: format!("{} returned status {}", query.path, status.as_u16()),
            });
        }

        match response.json::<Value>().await {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(other) => Err(RegistryError::Decode {
                provider: PROVIDER,
                detail: format!("{} returned a non-list payload: {other}", query.path),
            }),
            Err(err) => Err(RegistryError::Decode {
                provider: PROVIDER,
                detail: err.to_string(),
            }),
        }
    }
}

#[async_trait]
impl SanctionsRegistry for SanctionsClient {
    async fn search(&self, document: &Document) -> Result<SanctionsRecord, RegistryError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RegistryError::NotConfigured {
                provider: PROVIDER,
                detail: "SANCTIONS_API_KEY is not set",
            })?;

        // One list at a time; the upstream throttles bursts per key.
        let debarment = self.query_list(DEBARMENT, document, api_key).await;
        let corporate_penalty = self.query_list(CORPORATE_PENALTY, document, api_key).await;
        let nonprofit_impediment = self
            .query_list(NONPROFIT_IMPEDIMENT, document, api_key)
            .await;

        Ok(SanctionsRecord {
            debarment,
            corporate_penalty,
            nonprofit_impediment,
        })
    }
}

/// Keeps entries whose subject identifier equals `document` exactly.
fn retain_subject(entries: Vec<Value>, fields: &[&str], document: &str) -> Vec<Value> {
    entries
        .into_iter()
        .filter(|entry| {
            fields.iter().any(|field| match entry.get(*field) {
                Some(Value::String(value)) => value == document,
                Some(Value::Number(value)) => value.to_string() == document,
                _ => false,
            })
        })
        .collect()
}
