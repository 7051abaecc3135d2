use crate::cli::ServeArgs;
use crate::infra::{AppState, Components};
use crate::routes::{cors_layer, with_service_routes};
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use kyc_dossier::auth::TokenVerifier;
use kyc_dossier::config::{AppConfig, StoreConfig};
use kyc_dossier::error::AppError;
use kyc_dossier::store::{
    MemoryDossierRepository, MemoryMonitoringRepository, PostgrestClient,
    PostgrestDossierRepository, PostgrestMonitoringRepository,
};
use kyc_dossier::telemetry;
use kyc_dossier::workflows::dossier::DossierService;
use kyc_dossier::workflows::monitoring::MonitoringService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

fn api_router(config: &AppConfig, components: Components) -> Router {
    let Components {
        aggregator,
        narrative,
        http,
    } = components;

    match &config.store {
        StoreConfig {
            url: Some(url),
            key: Some(key),
        } => {
            info!(store = %url, "using PostgREST store");
            let client = PostgrestClient::new(http, url.clone(), key.clone());
            let dossiers = DossierService::new(
                Arc::new(PostgrestDossierRepository::new(client.clone())),
                aggregator.clone(),
                narrative,
            )
            .with_batch_delay(config.batch.delay);
            let monitoring = MonitoringService::new(
                Arc::new(PostgrestMonitoringRepository::new(client)),
                aggregator,
            );
            with_service_routes(Arc::new(dossiers), Arc::new(monitoring))
        }
        _ => {
            info!("STORE_URL not set; records are kept in memory");
            let dossiers = DossierService::new(
                Arc::new(MemoryDossierRepository::default()),
                aggregator.clone(),
                narrative,
            )
            .with_batch_delay(config.batch.delay);
            let monitoring = MonitoringService::new(
                Arc::new(MemoryMonitoringRepository::default()),
                aggregator,
            );
            with_service_routes(Arc::new(dossiers), Arc::new(monitoring))
        }
    }
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let components = Components::from_config(&config)?;
    let verifier = TokenVerifier::from_config(&config.auth);

    let app = api_router(&config, components)
        .layer(Extension(verifier))
        .layer(Extension(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server.cors_origins))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "kyc dossier service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
