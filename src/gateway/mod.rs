//! Payment gateway boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod midtrans;

pub use midtrans::{MidtransEnvironment, SnapClient};

/// Everything the gateway needs to open a hosted checkout for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub order_id: String,
    pub amount: i64,
    pub customer_name: String,
    pub customer_email: String,
}

/// Opaque hosted-payment handle returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySession {
    pub token: String,
    pub redirect_url: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Request(String),

    #[error("gateway returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse gateway response: {0}")]
    ParseResponse(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(&self, request: &SessionRequest) -> Result<GatewaySession, GatewayError>;
}
