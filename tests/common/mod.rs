#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;

use premium_server::config::BillingConfig;
use premium_server::gateway::{GatewayError, GatewaySession, PaymentGateway, SessionRequest};
use premium_server::mail::{DispatchError, MailTransport, NotificationDispatcher};
use premium_server::models::{Customer, Transaction};
use premium_server::routes::create_routes;
use premium_server::services::{
    expected_status_code, IdentifierAllocator, NotificationProcessor, SignatureVerifier, TransactionService,
};
use premium_server::state::AppState;
use premium_server::store::{InMemoryTransactionStore, TransactionStore};

pub const USER_ID: i32 = 7;
pub const SERVER_KEY: &str = "SB-Mid-server-test";

#[derive(Default)]
pub struct FakeGateway {
    pub fail: AtomicBool,
    pub requests: Mutex<Vec<SessionRequest>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_session(&self, request: &SessionRequest) -> Result<GatewaySession, GatewayError> {
        self.requests.lock().await.push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Request("connection refused".to_string()));
        }
        Ok(GatewaySession {
            token: format!("snap-token-{}", request.order_id),
            redirect_url: format!("https://app.sandbox.test/snap/v2/{}", request.order_id),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    pub fail: AtomicBool,
    pub sent: Mutex<Vec<SentMail>>,
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), DispatchError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DispatchError::Transport("relay unavailable".to_string()));
        }
        self.sent.lock().await.push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: html_body.to_string(),
        });
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: InMemoryTransactionStore,
    pub gateway: Arc<FakeGateway>,
    pub mailer: Arc<RecordingMailer>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(false, IdentifierAllocator::new(32)).await
    }

    pub async fn with_signatures() -> Self {
        Self::build(true, IdentifierAllocator::new(32)).await
    }

    pub async fn with_allocator(allocator: IdentifierAllocator) -> Self {
        Self::build(false, allocator).await
    }

    async fn build(verify: bool, allocator: IdentifierAllocator) -> Self {
        let store = InMemoryTransactionStore::new();
        for (id, name) in [(USER_ID, "Jane Doe"), (8, "John Roe")] {
            store
                .add_customer(Customer {
                    id,
                    full_name: name.to_string(),
                    email: format!("user{}@example.com", id),
                })
                .await;
        }

        let gateway = Arc::new(FakeGateway::default());
        let mailer = Arc::new(RecordingMailer::default());

        let transactions = TransactionService::new(
            Arc::new(store.clone()),
            gateway.clone(),
            allocator,
            BillingConfig::default(),
        );
        let notifications = NotificationProcessor::new(
            Arc::new(store.clone()),
            NotificationDispatcher::new(mailer.clone(), "Upgrade Rektslix Premium"),
            verify.then(|| SignatureVerifier::new(SERVER_KEY)),
        );

        let router = create_routes(AppState::new(transactions, notifications));
        Self {
            router,
            store,
            gateway,
            mailer,
        }
    }

    pub async fn request(&self, method: &str, uri: &str, user: Option<i32>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user.to_string());
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse { status, body }
    }

    pub async fn create(&self) -> Transaction {
        let response = self.request("POST", "/api/v1/transactions", Some(USER_ID), None).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        serde_json::from_value(response.body["data"]["transaction"].clone()).unwrap()
    }

    pub async fn notify(&self, payload: Value) -> TestResponse {
        self.request("POST", "/api/v1/notification", None, Some(payload)).await
    }

    pub async fn stored(&self, id: i32) -> Option<Transaction> {
        self.store.get_by_id(id).await.unwrap()
    }

    pub async fn mail_count(&self) -> usize {
        self.mailer.sent.lock().await.len()
    }
}

pub fn notification(order_id: i32, transaction_status: &str, fraud_status: Option<&str>) -> Value {
    let mut payload = serde_json::json!({
        "order_id": order_id.to_string(),
        "transaction_status": transaction_status,
        "status_code": expected_status_code(transaction_status, fraud_status).unwrap_or("200"),
        "gross_amount": "25000.00",
    });
    if let Some(fraud) = fraud_status {
        payload["fraud_status"] = Value::String(fraud.to_string());
    }
    payload
}

pub fn signed(mut payload: Value, server_key: &str) -> Value {
    let verifier = SignatureVerifier::new(server_key);
    let signature = verifier.sign(
        payload["order_id"].as_str().unwrap(),
        payload["status_code"].as_str().unwrap(),
        payload["gross_amount"].as_str().unwrap(),
    );
    payload["signature_key"] = Value::String(signature);
    payload
}
