//! Test helper utilities for running the client against live HTTP servers
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use img_gacha::{
    app_state::AppState,
    routes,
    services::{
        client::GachaClient,
        poller::PollConfig,
        stub::StubConfig,
        transport::TransportConfig,
    },
};
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral loopback port and return its address.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });
    addr
}

/// Start the stub backend and return the API base URL (`http://.../api`).
pub async fn spawn_stub(config: StubConfig) -> String {
    let addr = serve(routes::router(AppState::new(config), None)).await;
    format!("http://{addr}/api")
}

/// A loopback address nothing is listening on.
pub fn closed_api_url() -> String {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
        listener.local_addr().expect("No local address").port()
    };
    format!("http://127.0.0.1:{port}/api")
}

pub fn transport(base_url: &str) -> TransportConfig {
    TransportConfig {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
    }
}

/// Polling tuned for tests: fast ticks, generous deadline.
pub fn fast_polling() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(20),
        max_consecutive_failures: 3,
        deadline: Duration::from_secs(10),
    }
}

pub fn client(base_url: &str, polling: PollConfig) -> GachaClient {
    GachaClient::new(&transport(base_url), polling).expect("Failed to build client")
}
