//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up the middleware pipeline (request ID, logging, recovery, metrics)
//! - Scope fault injection to the `/api/v1` work routes and bearer auth to
//!   `/api/v1/toggles`
//! - Bind the server to a listener and run the shutdown sequence

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
};

use crate::config::AppConfig;
use crate::health::HealthRegistry;
use crate::http::handlers::{api, health, metrics, toggles};
use crate::http::middleware::{
    inject_faults, log_requests, recover_panics, require_bearer, track_metrics, AdminToken,
};
use crate::http::request::{attach_context, request_id_header};
use crate::lifecycle::{DrainOutcome, ShutdownCoordinator, ShutdownError, ShutdownState};
use crate::observability::MetricsRegistry;
use crate::toggles::{ErrorToggle, FaultInjector};
use crate::work::WorkSimulator;

/// How long connections get to close once draining has finished.
const CONNECTION_CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Interval between exporter upkeep runs.
const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub toggles: Arc<ErrorToggle>,
    pub health: Arc<HealthRegistry>,
    pub metrics: Arc<MetricsRegistry>,
    pub work: WorkSimulator,
    /// Parent of every request's cancellation token.
    pub root_cancel: CancellationToken,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        Self {
            toggles: Arc::new(ErrorToggle::new()),
            health: Arc::new(HealthRegistry::new(config.health.check_timeout())),
            work: WorkSimulator::new(metrics.clone()),
            metrics,
            root_cancel: CancellationToken::new(),
            config: Arc::new(config),
        }
    }
}

/// HTTP server for the demo service.
pub struct HttpServer {
    router: Router,
    state: AppState,
    shutdown: Arc<ShutdownCoordinator>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self::with_state(AppState::new(config))
    }

    /// Create a server around existing service objects.
    pub fn with_state(state: AppState) -> Self {
        let shutdown = Arc::new(ShutdownCoordinator::new(
            state.metrics.clone(),
            state.root_cancel.clone(),
            &state.config.shutdown,
        ));
        let router = build_router(state.clone());
        Self {
            router,
            state,
            shutdown,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn shutdown_coordinator(&self) -> Arc<ShutdownCoordinator> {
        self.shutdown.clone()
    }

    /// Serve until shutdown is triggered on the coordinator, then drain.
    ///
    /// Stops accepting as soon as draining begins, waits for in-flight work
    /// up to the drain timeout, flushes metrics and returns how the drain
    /// ended. A drain timeout is reported in the outcome, not as an error.
    pub async fn run(self, listener: TcpListener) -> Result<DrainOutcome, ShutdownError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let shutdown = self.shutdown.clone();
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        let mut server = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move { shutdown.draining().await })
                    .await
            }
        });

        let upkeep = tokio::spawn({
            let metrics = self.state.metrics.clone();
            let mut state = shutdown.subscribe();
            async move {
                let mut ticker = time::interval(METRICS_UPKEEP_INTERVAL);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => metrics.run_upkeep(),
                        _ = state.wait_for(|s| *s == ShutdownState::Stopped) => break,
                    }
                }
            }
        });

        let served = tokio::select! {
            joined = &mut server => Some(flatten(joined)),
            _ = shutdown.draining() => None,
        };

        shutdown.begin_drain();
        tracing::info!("Stopped accepting new connections");
        let outcome = shutdown.drain().await;

        let served = match served {
            Some(served) => served,
            None => match time::timeout(CONNECTION_CLOSE_GRACE, &mut server).await {
                Ok(joined) => flatten(joined),
                Err(_) => {
                    tracing::warn!(
                        grace = ?CONNECTION_CLOSE_GRACE,
                        "Connections still open, forcing close"
                    );
                    server.abort();
                    Ok(())
                }
            },
        };

        teardown(&self.state.metrics, &shutdown, &upkeep, served)?;

        tracing::info!(timed_out = outcome.timed_out(), "HTTP server stopped");
        Ok(outcome)
    }
}

fn flatten(joined: Result<std::io::Result<()>, JoinError>) -> Result<(), ShutdownError> {
    joined??;
    Ok(())
}

/// Flush metrics, stop upkeep and enter `Stopped`, then surface any serve failure.
fn teardown(
    metrics: &MetricsRegistry,
    shutdown: &ShutdownCoordinator,
    upkeep: &JoinHandle<()>,
    served: Result<(), ShutdownError>,
) -> Result<(), ShutdownError> {
    metrics.run_upkeep();
    shutdown.finish();
    upkeep.abort();

    if let Err(error) = &served {
        tracing::error!(error = %error, "HTTP server failed");
    }
    served
}

/// Build the Axum router with all middleware layers.
///
/// Outer to inner: request ID, context, logging, panic recovery, metrics.
/// `/api/v1/ping` and `/api/v1/work` add fault injection; `/api/v1/toggles`
/// adds bearer auth and a body size limit.
pub fn build_router(state: AppState) -> Router {
    let admin_token = AdminToken::new(&state.config.admin.token);
    let injector: Arc<dyn FaultInjector> = state.toggles.clone();

    let toggle_routes = Router::new()
        .route("/error-rate", post(toggles::set_error_rate))
        .route("/readiness", post(toggles::set_readiness))
        .route_layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(admin_token, require_bearer))
                .layer(RequestBodyLimitLayer::new(
                    state.config.listener.max_body_bytes,
                )),
        );

    // Toggles are nested after the fault layer so they stay reachable
    // while every API call is failing.
    let api_routes = Router::new()
        .route("/ping", get(api::ping))
        .route("/work", get(api::work))
        .route_layer(middleware::from_fn_with_state(injector, inject_faults))
        .nest("/toggles", toggle_routes);

    Router::new()
        .route("/healthz", get(health::liveness))
        .route("/readyz", get(health::readiness))
        .route("/metrics", get(metrics::export))
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id_header(), MakeRequestUuid))
                .layer(PropagateRequestIdLayer::new(request_id_header()))
                .layer(middleware::from_fn_with_state(state.clone(), attach_context))
                .layer(middleware::from_fn(log_requests))
                .layer(middleware::from_fn(recover_panics))
                .layer(middleware::from_fn_with_state(
                    state.metrics.clone(),
                    track_metrics,
                )),
        )
        .with_state(state)
}
