//! Payment notification reconciliation.
//!
//! The gateway posts a status callback for every change on an order and
//! redelivers until it gets a 2xx. Reconciliation is split in two: a pure
//! mapping from gateway vocabulary to [`TransactionStatus`], and the effectful
//! part that applies it to the store and sends the status email.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use tracing::{debug, error, info, warn};

use crate::mail::NotificationDispatcher;
use crate::models::{StatusChange, TransactionStatus, Transition};
use crate::store::TransactionStoreBox;
use crate::utils::error::AppError;

/// Callback body. Only `order_id` and `transaction_status` are required.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPayload {
    pub order_id: String,
    pub transaction_status: String,
    #[serde(default)]
    pub fraud_status: Option<String>,
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub gross_amount: Option<String>,
    #[serde(default)]
    pub signature_key: Option<String>,
}

impl NotificationPayload {
    pub fn parse(body: &[u8]) -> Result<Self, AppError> {
        let payload: NotificationPayload = serde_json::from_slice(body)
            .map_err(|e| AppError::MalformedWebhook(e.to_string()))?;

        if payload.order_id.trim().is_empty() {
            return Err(AppError::MalformedWebhook("order_id is empty".to_string()));
        }
        Ok(payload)
    }
}

/// Maps the gateway's `transaction_status`/`fraud_status` pair to the status
/// the transaction should have. `None` means the pair is not one we act on.
pub fn resolve_status(
    transaction_status: &str,
    fraud_status: Option<&str>,
) -> Option<TransactionStatus> {
    match (transaction_status, fraud_status) {
        ("capture", Some("challenge")) => Some(TransactionStatus::Pending),
        ("capture", Some("accept")) => Some(TransactionStatus::Success),
        ("capture", _) => None,
        ("settlement", _) => Some(TransactionStatus::Success),
        ("deny", _) => Some(TransactionStatus::Failed),
        ("cancel", _) | ("expire", _) => Some(TransactionStatus::Failed),
        ("pending", _) => Some(TransactionStatus::Pending),
        _ => None,
    }
}

/// The `status_code` the gateway sends alongside a status pair. The signature
/// covers `status_code` but not `transaction_status`, so the two must agree.
pub fn expected_status_code(
    transaction_status: &str,
    fraud_status: Option<&str>,
) -> Option<&'static str> {
    match (transaction_status, fraud_status) {
        ("capture", Some("challenge")) => Some("201"),
        ("capture", _) | ("settlement", _) | ("cancel", _) => Some("200"),
        ("pending", _) => Some("201"),
        ("deny", _) => Some("202"),
        ("expire", _) => Some("407"),
        _ => None,
    }
}

/// Checks `signature_key = hex(SHA512(order_id + status_code + gross_amount + server_key))`.
pub struct SignatureVerifier {
    server_key: String,
}

impl SignatureVerifier {
    pub fn new(server_key: impl Into<String>) -> Self {
        Self {
            server_key: server_key.into(),
        }
    }

    pub fn sign(&self, order_id: &str, status_code: &str, gross_amount: &str) -> String {
        let mut hasher = Sha512::new();
        hasher.update(order_id.as_bytes());
        hasher.update(status_code.as_bytes());
        hasher.update(gross_amount.as_bytes());
        hasher.update(self.server_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify(&self, payload: &NotificationPayload) -> Result<(), AppError> {
        let (Some(status_code), Some(gross_amount), Some(signature)) = (
            payload.status_code.as_deref(),
            payload.gross_amount.as_deref(),
            payload.signature_key.as_deref(),
        ) else {
            return Err(AppError::InvalidSignature);
        };

        if self.server_key.is_empty() {
            return Err(AppError::InvalidSignature);
        }

        let expected = self.sign(&payload.order_id, status_code, gross_amount);
        if !constant_time_eq(expected.as_bytes(), signature.to_ascii_lowercase().as_bytes()) {
            return Err(AppError::InvalidSignature);
        }

        match expected_status_code(&payload.transaction_status, payload.fraud_status.as_deref()) {
            Some(code) if code != status_code.trim() => Err(AppError::InvalidSignature),
            _ => Ok(()),
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotificationOutcome {
    /// The status pair is not one we act on.
    Unrecognized,
    /// No live transaction matches the order reference.
    UnknownOrder,
    Reconciled {
        order_id: i32,
        previous: TransactionStatus,
        status: TransactionStatus,
        transition: Transition,
        notified: bool,
    },
}

pub struct NotificationProcessor {
    store: TransactionStoreBox,
    dispatcher: NotificationDispatcher,
    verifier: Option<SignatureVerifier>,
}

impl NotificationProcessor {
    pub fn new(
        store: TransactionStoreBox,
        dispatcher: NotificationDispatcher,
        verifier: Option<SignatureVerifier>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            verifier,
        }
    }

    pub async fn process(&self, payload: NotificationPayload) -> Result<NotificationOutcome, AppError> {
        if let Some(verifier) = &self.verifier {
            verifier.verify(&payload)?;
        }

        let order_ref = payload.order_id.as_str();
        let Some(status) =
            resolve_status(&payload.transaction_status, payload.fraud_status.as_deref())
        else {
            warn!(
                order_id = %order_ref,
                transaction_status = %payload.transaction_status,
                fraud_status = ?payload.fraud_status,
                "Unrecognized notification, ignoring"
            );
            return Ok(NotificationOutcome::Unrecognized);
        };

        let Some(transaction) = self.store.get_by_order_ref(order_ref).await? else {
            warn!(order_id = %order_ref, "Notification for unknown order");
            return Ok(NotificationOutcome::UnknownOrder);
        };

        let Some(change) = self.store.apply_status(transaction.id, status).await? else {
            warn!(order_id = %order_ref, "Order disappeared before its status could be applied");
            return Ok(NotificationOutcome::UnknownOrder);
        };

        match change.transition {
            Transition::Applied => info!(
                order_id = transaction.id,
                previous = %change.previous,
                status = %status,
                "Transaction status updated"
            ),
            Transition::Unchanged => debug!(
                order_id = transaction.id,
                status = %status,
                "Redelivered notification, status unchanged"
            ),
            Transition::Rejected => warn!(
                order_id = transaction.id,
                current = %change.previous,
                requested = %status,
                "Ignoring status change for a settled transaction"
            ),
        }

        let notified = if change.entered_terminal() {
            self.notify(&change).await
        } else {
            false
        };

        Ok(NotificationOutcome::Reconciled {
            order_id: transaction.id,
            previous: change.previous,
            status: change.transaction.status,
            transition: change.transition,
            notified,
        })
    }

    /// Email is outside the consistency boundary: failures are logged only.
    async fn notify(&self, change: &StatusChange) -> bool {
        let order_id = change.transaction.id;
        let customer = match self.store.customer(change.transaction.user_id).await {
            Ok(Some(customer)) => customer,
            Ok(None) => {
                warn!(order_id, user_id = change.transaction.user_id, "No customer to notify");
                return false;
            }
            Err(e) => {
                error!(order_id, error = %e, "Failed to load customer for status mail");
                return false;
            }
        };

        match self.dispatcher.dispatch(change, &customer).await {
            Ok(sent) => sent,
            Err(e) => {
                error!(order_id, error = %e, "Failed to send status mail");
                false
            }
        }
    }
}
