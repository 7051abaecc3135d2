use kyc_dossier::config::{AppConfig, NarrativeConfig, RegistryConfig};
use kyc_dossier::error::AppError;
use kyc_dossier::narrative::{GeminiClient, NarrativeWriter};
use kyc_dossier::registry::{
    CompanyRegistryClient, PostalCodeClient, RegistryError, SanctionsClient,
};
use kyc_dossier::risk::RiskAggregator;
use metrics_exporter_prometheus::PrometheusHandle;
use reqwest::Client;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared HTTP client for every upstream; per-request timeouts are set by each adapter.
pub(crate) fn http_client() -> Result<Client, AppError> {
    Client::builder()
        .user_agent(concat!("kyc-dossier/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| AppError::Client(RegistryError::Client(err)))
}

pub(crate) fn build_aggregator(config: &RegistryConfig, http: &Client) -> RiskAggregator {
    if config.sanctions_api_key.is_none() {
        warn!("SANCTIONS_API_KEY not set; sanctions lists will be reported as unavailable");
    }

    RiskAggregator::new(
        Arc::new(CompanyRegistryClient::new(
            http.clone(),
            config.primary_url.clone(),
            config.secondary_url.clone(),
        )),
        Arc::new(PostalCodeClient::new(http.clone(), config.postal_url.clone())),
        Arc::new(SanctionsClient::new(
            http.clone(),
            config.sanctions_url.clone(),
            config.sanctions_api_key.clone(),
        )),
    )
}

pub(crate) fn build_narrative(config: &NarrativeConfig, http: &Client) -> NarrativeWriter {
    match &config.api_key {
        Some(key) => {
            let client = GeminiClient::new(
                http.clone(),
                config.api_url.clone(),
                key.clone(),
                config.model.clone(),
            );
            info!(models = ?client.models(), "narrative generation enabled");
            NarrativeWriter::new(Arc::new(client))
        }
        None => NarrativeWriter::disabled(),
    }
}

/// Aggregation stack and narrative writer built from one configuration.
pub(crate) struct Components {
    pub(crate) aggregator: RiskAggregator,
    pub(crate) narrative: NarrativeWriter,
    pub(crate) http: Client,
}

impl Components {
    pub(crate) fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let http = http_client()?;
        Ok(Self {
            aggregator: build_aggregator(&config.registries, &http),
            narrative: build_narrative(&config.narrative, &http),
            http,
        })
    }
}
