mod routes;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{config::Config, recovery::RecoveryEngine, Result};

pub struct Server {
    engine: Arc<RecoveryEngine>,
    max_body_bytes: usize,
}

impl Server {
    pub fn new(config: &Config, engine: Arc<RecoveryEngine>) -> Self {
        Self {
            engine,
            max_body_bytes: config.server.max_body_bytes,
        }
    }

    pub fn build_router(self) -> Router {
        let max_body_bytes = self.max_body_bytes;
        let state = Arc::new(self);

        Router::new()
            .route("/health", get(routes::health))
            .route("/webhook", post(routes::webhook))
            .route("/metrics", get(routes::metrics))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(DefaultBodyLimit::max(max_body_bytes)),
            )
            .with_state(state)
    }

    /// Serves until SIGINT or SIGTERM.
    pub async fn start(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
