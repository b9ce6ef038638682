//! Midtrans Snap client.
//!
//! Opens a Snap checkout with `POST <base>/transactions`, authenticated with
//! HTTP basic auth where the username is the server key and the password is
//! empty.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{GatewayError, GatewaySession, PaymentGateway, SessionRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidtransEnvironment {
    Sandbox,
    Production,
}

impl MidtransEnvironment {
    /// Parse from string (environment variable).
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => MidtransEnvironment::Production,
            _ => MidtransEnvironment::Sandbox,
        }
    }

    pub fn snap_url(&self) -> &'static str {
        match self {
            MidtransEnvironment::Sandbox => "https://app.sandbox.midtrans.com/snap/v1",
            MidtransEnvironment::Production => "https://app.midtrans.com/snap/v1",
        }
    }
}

#[derive(Serialize)]
struct SnapRequest<'a> {
    transaction_details: TransactionDetails<'a>,
    credit_card: CreditCard,
    customer_details: CustomerDetails<'a>,
}

#[derive(Serialize)]
struct TransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: i64,
}

#[derive(Serialize)]
struct CreditCard {
    secure: bool,
}

#[derive(Serialize)]
struct CustomerDetails<'a> {
    first_name: &'a str,
    email: &'a str,
}

#[derive(Deserialize)]
struct SnapResponse {
    token: String,
    redirect_url: String,
}

pub struct SnapClient {
    base_url: String,
    server_key: String,
    client: reqwest::Client,
}

impl SnapClient {
    pub fn new(
        environment: MidtransEnvironment,
        server_key: String,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Self::with_base_url(environment.snap_url().to_string(), server_key, timeout)
    }

    /// Create a client against a custom Snap URL (mock servers, proxies).
    pub fn with_base_url(
        base_url: String,
        server_key: String,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            server_key,
            client,
        })
    }

    fn body<'a>(request: &'a SessionRequest) -> SnapRequest<'a> {
        SnapRequest {
            transaction_details: TransactionDetails {
                order_id: &request.order_id,
                gross_amount: request.amount,
            },
            credit_card: CreditCard { secure: true },
            customer_details: CustomerDetails {
                first_name: &request.customer_name,
                email: &request.customer_email,
            },
        }
    }
}

#[async_trait]
impl PaymentGateway for SnapClient {
    async fn create_session(&self, request: &SessionRequest) -> Result<GatewaySession, GatewayError> {
        let url = format!("{}/transactions", self.base_url);
        debug!(order_id = %request.order_id, amount = request.amount, "Requesting Snap session");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.server_key, Some(""))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&Self::body(request))
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(order_id = %request.order_id, status, "Snap rejected session request");
            return Err(GatewayError::Api { status, body });
        }

        let snap: SnapResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::ParseResponse(e.to_string()))?;

        Ok(GatewaySession {
            token: snap.token,
            redirect_url: snap.redirect_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse_defaults_to_sandbox() {
        assert_eq!(MidtransEnvironment::parse("production"), MidtransEnvironment::Production);
        assert_eq!(MidtransEnvironment::parse("PROD"), MidtransEnvironment::Production);
        assert_eq!(MidtransEnvironment::parse("anything"), MidtransEnvironment::Sandbox);
    }

    #[test]
    fn test_request_body_shape() {
        let request = SessionRequest {
            order_id: "42".to_string(),
            amount: 25000,
            customer_name: "Jane".to_string(),
            customer_email: "jane@example.com".to_string(),
        };

        let body = serde_json::to_value(SnapClient::body(&request)).unwrap();
        assert_eq!(body["transaction_details"]["order_id"], "42");
        assert_eq!(body["transaction_details"]["gross_amount"], 25000);
        assert_eq!(body["credit_card"]["secure"], true);
        assert_eq!(body["customer_details"]["email"], "jane@example.com");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = SnapClient::with_base_url(
            "http://localhost:9000/snap/v1/".to_string(),
            "key".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:9000/snap/v1");
    }
}
