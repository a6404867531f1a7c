//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health report and admin handlers
//! - Wire up middleware (tracing, request timeout)
//! - Bind server to listener and stop on shutdown

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::{AdminConfig, ServerConfig};
use crate::health::{HealthReport, HealthReporter, Watcher};
use crate::lifecycle::shutdown::ShutdownListener;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub reporter: Arc<HealthReporter>,
    pub watcher: Arc<Watcher>,
    pub admin: AdminConfig,
}

/// HTTP server exposing the health report.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    #[allow(deprecated)]
    pub fn new(config: &ServerConfig, state: AppState) -> Self {
        let router = build_router(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)));
        Self { router }
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: ShutdownListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all routes and tracing.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone());

    if state.admin.enabled {
        router = router.merge(setup_admin_router(state));
    }

    router.layer(TraceLayer::new_for_http())
}

/// Health report for dashboards and orchestrators.
async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.reporter.report())
}
