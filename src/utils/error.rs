use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::gateway::GatewayError;
use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Malformed webhook: {0}")]
    MalformedWebhook(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Invalid notification signature")]
    InvalidSignature,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("No free transaction id after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },

    #[error("Persistence error")]
    Persistence(#[from] StoreError),

    #[error("Payment gateway error for order {order_id}")]
    Gateway {
        order_id: i32,
        #[source]
        source: GatewayError,
    },
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::MalformedWebhook(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) | AppError::InvalidSignature => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AllocationExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Gateway { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::MalformedWebhook(_) => "MALFORMED_WEBHOOK",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::InvalidSignature => "INVALID_SIGNATURE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::AllocationExhausted { .. } => "ALLOCATION_EXHAUSTED",
            AppError::Persistence(_) => "DATABASE_ERROR",
            AppError::Gateway { .. } => "GATEWAY_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::MalformedWebhook(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::InvalidSignature => {
                warn!(code = self.code(), "Notification signature mismatch");
            }
            AppError::AllocationExhausted { attempts } => {
                error!(attempts, "Transaction id space exhausted");
            }
            AppError::Persistence(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::Gateway { order_id, source } => {
                error!(order_id, error = %source, "Payment gateway error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::MalformedWebhook(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Persistence(_) => "A database error occurred".to_string(),
            AppError::Gateway { .. } => {
                "Payment session could not be created; the transaction is kept pending".to_string()
            }
            other => other.to_string(),
        };

        let details = match &self {
            AppError::Gateway { order_id, .. } => Some(json!({ "order_id": order_id })),
            _ => None,
        };

        error_response(code, public_message, details, status)
    }
}
