use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::services::NotificationPayload;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

/// Gateway callback. Anything other than a malformed or unsigned payload is
/// acknowledged with 200 so the gateway stops redelivering.
pub async fn handle_notification(State(state): State<AppState>, body: Bytes) -> Response {
    let payload = match NotificationPayload::parse(&body) {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };

    match state.notifications.process(payload).await {
        Ok(outcome) => success(outcome, "Notification received"),
        Err(e @ (AppError::InvalidSignature | AppError::MalformedWebhook(_))) => e.into_response(),
        Err(e) => {
            error!(error = ?e, "Notification processing failed");
            empty_success("Notification received")
        }
    }
}
