//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use monitoring_demo::config::AppConfig;
use monitoring_demo::http::AppState;
use monitoring_demo::lifecycle::{self, DrainOutcome, ShutdownCoordinator, ShutdownError};

pub const ADMIN_TOKEN: &str = "integration-token";

/// A running server on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub shutdown: Arc<ShutdownCoordinator>,
    pub handle: JoinHandle<Result<DrainOutcome, ShutdownError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server to finish.
    pub async fn stop(self) -> DrainOutcome {
        self.shutdown.begin_drain();
        self.handle
            .await
            .expect("server task panicked")
            .expect("server failed")
    }
}

/// Start the service with test defaults, adjusted by `configure`.
pub async fn spawn_server(configure: impl FnOnce(&mut AppConfig)) -> TestServer {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.admin.token = ADMIN_TOKEN.to_string();
    configure(&mut config);

    let started = lifecycle::bind(config).await.expect("bind test server");
    let state = started.server.state().clone();
    let shutdown = started.server.shutdown_coordinator();
    let addr = started.local_addr;
    let handle = tokio::spawn(started.server.run(started.listener));

    TestServer {
        addr,
        state,
        shutdown,
        handle,
    }
}

/// Client without connection pooling or system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// POST a toggle update with the admin token.
pub async fn post_admin(
    client: &reqwest::Client,
    server: &TestServer,
    path: &str,
    body: serde_json::Value,
) -> reqwest::Response {
    client
        .post(server.url(path))
        .bearer_auth(ADMIN_TOKEN)
        .json(&body)
        .send()
        .await
        .expect("admin request failed")
}

/// Poll until the in-flight work gauge reads zero or `timeout` elapses.
pub async fn wait_for_idle(state: &AppState, timeout: Duration) -> bool {
    tokio::time::timeout(timeout, state.metrics.wait_for_idle())
        .await
        .is_ok()
}
