use img_gacha::{app_state::AppState, config::AppConfig, routes};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");
    let stub = config.stub();

    tracing::info!(
        processing_after_ms = stub.processing_after.as_millis() as u64,
        complete_after_ms = stub.complete_after.as_millis() as u64,
        "Initializing gacha stub backend"
    );

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");

    metrics::describe_counter!(
        "stub_generation_requests_total",
        "Generation requests accepted by the stub backend"
    );
    metrics::describe_counter!(
        "stub_generation_completed_total",
        "Stub tasks that reached the completed state"
    );

    let app = routes::router(AppState::new(stub), Some(prometheus_handle));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Stub backend listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
