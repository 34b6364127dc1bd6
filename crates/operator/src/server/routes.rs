use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};
use http::{header, StatusCode};
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use super::Server;
use crate::alerts::AlertBatch;

pub async fn health() -> &'static str {
    "healthy"
}

/// AlertManager delivery. Always acknowledges once every alert has been
/// attempted; per-alert failures only show up in logs and counters.
pub async fn webhook(State(server): State<Arc<Server>>, body: Bytes) -> Response {
    let batch: AlertBatch = match serde_json::from_slice(&body) {
        Ok(batch) => batch,
        Err(e) => {
            warn!("Rejecting webhook payload: {}", e);
            return (StatusCode::BAD_REQUEST, format!("invalid alert batch: {}", e))
                .into_response();
        }
    };

    let delivery = Uuid::new_v4();
    let span = tracing::info_span!("delivery", id = %delivery, alerts = batch.alerts.len());
    let engine = server.engine.clone();

    // Detached so a sender hanging up cannot abandon an issued mutation or the
    // rest of the batch; the request only waits for it.
    let processing = tokio::spawn(
        async move {
            info!("Received {} alerts", batch.alerts.len());
            engine.handle_batch(&batch).await;
        }
        .instrument(span),
    );
    if let Err(e) = processing.await {
        error!("Batch {} did not complete: {}", delivery, e);
    }

    (StatusCode::OK, "OK").into_response()
}

pub async fn metrics(State(server): State<Arc<Server>>) -> Response {
    match server.engine.counters().gather() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            text,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
