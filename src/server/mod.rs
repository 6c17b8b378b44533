//! HTTP server for bq-report.
//!
//! Exposes the report engine as JSON endpoints and serves the dashboard
//! page and its static assets.

pub mod handlers;
pub mod state;

pub use state::AppState;

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Builds the router: report API, health check, dashboard and static files.
pub fn build_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    Router::new()
        .route("/report", get(handlers::report))
        .route("/report/raw", get(handlers::report_raw))
        .route("/report/page", get(handlers::report_page))
        .route("/report/count", get(handlers::report_count))
        .route("/healthz", get(handlers::healthz))
        .route_service("/", ServeFile::new(&server.index_file))
        .nest_service("/static", ServeDir::new(&server.static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `router` until `shutdown` is cancelled, then drains in-flight requests.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Completes on SIGINT or SIGTERM and returns the signal name.
pub async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        signal = ctrl_c => signal,
        signal = terminate => signal,
    }
}

/// Cancels `shutdown` once a termination signal arrives.
pub fn cancel_on_signal(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let signal = shutdown_signal().await;
        info!("Received {}, shutting down", signal);
        shutdown.cancel();
    });
}
