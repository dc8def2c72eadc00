//! HTTP API for consultations.
//!
//! [`router`] assembles the routes; [`serve`] binds the listener and runs
//! until SIGINT or SIGTERM.

pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::consultation::ConsultationService;
use crate::error::Result;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared handler state
pub struct AppState {
    /// Consultation operations
    pub service: Arc<ConsultationService>,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/consultation/session", post(handlers::create_session))
        .route("/api/consultation/message", post(handlers::send_message))
        .route(
            "/api/consultation/session/{session_id}/history",
            get(handlers::get_history),
        )
        .with_state(state)
}

/// Serve the API on `bind` until a shutdown signal arrives
///
/// # Errors
///
/// Returns error if the address is invalid or the listener cannot bind
pub async fn serve(bind: &str, service: Arc<ConsultationService>) -> Result<()> {
    let addr: SocketAddr = bind.parse().map_err(|e| {
        crate::error::CounselError::Config(format!("Invalid bind address {}: {}", bind, e))
    })?;
    let app = router(Arc::new(AppState { service }));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Consultation API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Consultation API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install CTRL+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => tracing::warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
