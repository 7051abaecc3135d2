use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::domain::{OrganizationLookup, RegistryRecord, RegistrySources, SourceStatus};
use super::mapping::{PRIMARY_FIELDS, SECONDARY_FIELDS};
use super::{OrganizationRegistry, RegistryError};

const PRIMARY: &str = "primary company registry";
const SECONDARY: &str = "secondary company registry";
const PRIMARY_TIMEOUT: Duration = Duration::from_secs(10);
const SECONDARY_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = "kyc-dossier";

/// Fixed waits applied when the primary registry answers 429.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
        }
    }
}

impl RetryPolicy {
    /// Same attempt count as the default with no waiting in between.
    pub fn immediate() -> Self {
        Self {
            delays: vec![Duration::ZERO; 3],
        }
    }
}

/// Primary registry with a secondary registry used as fallback and for founding-date enrichment.
#[derive(Debug, Clone)]
pub struct CompanyRegistryClient {
    http: Client,
    primary_url: String,
    secondary_url: String,
    retry: RetryPolicy,
}

impl CompanyRegistryClient {
    pub fn new(
        http: Client,
        primary_url: impl Into<String>,
        secondary_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            primary_url: primary_url.into(),
            secondary_url: secondary_url.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_primary(&self, cnpj: &str) -> Result<Value, RegistryError> {
        let url = format!("{}/{}", self.primary_url.trim_end_matches('/'), cnpj);
        let send = || {
            self.http
                .get(&url)
                .timeout(PRIMARY_TIMEOUT)
                .send()
        };

        let mut response = send()
            .await
            .map_err(|err| RegistryError::transport(PRIMARY, err))?;

        for delay in &self.retry.delays {
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                break;
            }
            debug!(cnpj, ?delay, "primary registry rate limited; backing off");
            tokio::time::sleep(*delay).await;
            response = send()
                .await
                .map_err(|err| RegistryError::transport(PRIMARY, err))?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Upstream {
                provider: PRIMARY,
                status: Some(status.as_u16()),
                detail: format!("status {}", status.as_u16()),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| RegistryError::Decode {
                provider: PRIMARY,
                detail: err.to_string(),
            })
    }

    async fn fetch_secondary(&self, cnpj: &str) -> Result<RegistryRecord, RegistryError> {
        let url = format!("{}/{}", self.secondary_url.trim_end_matches('/'), cnpj);
        let response = self
            .http
            .get(&url)
            .timeout(SECONDARY_TIMEOUT)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|err| RegistryError::transport(SECONDARY, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Upstream {
                provider: SECONDARY,
                status: Some(status.as_u16()),
                detail: format!("status {}", status.as_u16()),
            });
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|err| RegistryError::Decode {
                provider: SECONDARY,
                detail: err.to_string(),
            })?;

        // The secondary registry reports lookup failures inside a 200 body.
        if payload.get("status").and_then(Value::as_str) == Some("ERROR") {
            let detail = payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("lookup rejected")
                .to_string();
            return Err(RegistryError::NotFound {
                provider: SECONDARY,
                detail,
            });
        }

        Ok(RegistryRecord::from_payload(&payload, SECONDARY_FIELDS))
    }
}

#[async_trait]
impl OrganizationRegistry for CompanyRegistryClient {
    async fn lookup(&self, cnpj: &str) -> Result<OrganizationLookup, RegistryError> {
        match self.fetch_primary(cnpj).await {
            Ok(payload) => {
                let mut record = RegistryRecord::from_payload(&payload, PRIMARY_FIELDS);
                let mut sources = RegistrySources {
                    primary: SourceStatus::Ok,
                    secondary: SourceStatus::NotQueried,
                };

                if record.founding_date.is_empty() {
                    match self.fetch_secondary(cnpj).await {
                        Ok(fallback) => {
                            record.enrich_identity(&fallback);
                            sources.secondary = SourceStatus::Ok;
                        }
                        Err(err) => {
                            warn!(cnpj, error = %err, "founding date enrichment failed");
                            sources.secondary = SourceStatus::failed(&err);
                        }
                    }
                }

                Ok(OrganizationLookup { record, sources })
            }
            Err(primary_err) => {
                info!(cnpj, error = %primary_err, "falling back to secondary company registry");
                match self.fetch_secondary(cnpj).await {
                    Ok(record) => Ok(OrganizationLookup {
                        record,
                        sources: RegistrySources {
                            primary: SourceStatus::failed(&primary_err),
                            secondary: SourceStatus::Ok,
                        },
                    }),
                    Err(secondary_err) => Err(RegistryError::Upstream {
                        provider: "company registries",
                        status: secondary_err.status().or_else(|| primary_err.status()),
                        detail: format!("{primary_err}; {secondary_err}"),
                    }),
                }
            }
        }
    }
}
