use crate::cli::ServeArgs;
use crate::infra::{in_memory_service, AppState};
use crate::routes::with_enrollment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use esr21_enrollment::config::AppConfig;
use esr21_enrollment::error::AppError;
use esr21_enrollment::telemetry;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (service, _store) = in_memory_service(config.enrollment.clone());
    let app = with_enrollment_routes(Arc::new(service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        secondary_capacity = config.enrollment.secondary_capacity,
        illness_numbering = ?config.enrollment.illness_numbering,
        "enrollment service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
