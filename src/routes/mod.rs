pub mod generate;
pub mod health;
pub mod metrics;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Build the stub backend router. `/metrics` is mounted only when a
/// Prometheus recorder handle is supplied.
pub fn router(state: AppState, prometheus: Option<PrometheusHandle>) -> Router {
    let api = Router::new()
        .route("/generate", post(generate::submit_generation))
        .route("/status/{task_id}", get(generate::get_generation_status))
        .route("/models", get(generate::list_models))
        .route("/health", get(health::health_check));

    let mut app: Router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .with_state(state);

    if let Some(handle) = prometheus {
        app = app.route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(handle),
        );
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
}
