use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryGrantRepository, InMemoryHistoryRepository};
use crate::routes::with_diagnosis_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use grant_insight::config::AppConfig;
use grant_insight::diagnosis::{DiagnosisService, IdentityPolicy, MatchingConfig, NonceGuard};
use grant_insight::error::AppError;
use grant_insight::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(path) = args.grants_csv.take() {
        config.diagnosis.grants_csv = Some(path);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let grants = Arc::new(InMemoryGrantRepository::load(
        config.diagnosis.grants_csv.as_deref(),
    )?);
    info!(grants = grants.len(), "grant catalog loaded");

    let history = Arc::new(InMemoryHistoryRepository::default());
    let (service, _history_worker) =
        DiagnosisService::spawn(grants, history, MatchingConfig::default());
    let guard = NonceGuard::from_config(&config.diagnosis);
    let identity = IdentityPolicy::from_config(&config.diagnosis);
    info!(?identity, "caller identity policy");

    let app = with_diagnosis_routes(Arc::new(service), guard, identity, config.diagnosis.debug)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "grant insight diagnosis service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
