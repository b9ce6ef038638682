//! Transaction status emails.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::models::{Customer, StatusChange, Transaction, TransactionStatus};

pub mod smtp;

pub use smtp::SmtpMailer;

const SUBJECT: &str = "Transaction Status";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid mail address: {0}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("mail relay error: {0}")]
    Transport(String),
}

/// Outgoing mail relay.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), DispatchError>;
}

/// Sends a summary email when a transaction enters a terminal status.
pub struct NotificationDispatcher {
    transport: std::sync::Arc<dyn MailTransport>,
    product_name: String,
}

impl NotificationDispatcher {
    pub fn new(transport: std::sync::Arc<dyn MailTransport>, product_name: impl Into<String>) -> Self {
        Self {
            transport,
            product_name: product_name.into(),
        }
    }

    /// Returns `Ok(true)` when an email went out, `Ok(false)` when the change
    /// does not warrant one (not terminal, or already in that status).
    pub async fn dispatch(&self, change: &StatusChange, to: &Customer) -> Result<bool, DispatchError> {
        if !should_notify(change.previous, change.transaction.status) {
            return Ok(false);
        }

        let body = render(&self.product_name, &change.transaction);
        self.transport.send(&to.email, SUBJECT, &body).await?;

        info!(
            order_id = change.transaction.id,
            status = %change.transaction.status,
            to = %to.email,
            "Transaction status mail sent"
        );
        Ok(true)
    }
}

fn should_notify(previous: TransactionStatus, current: TransactionStatus) -> bool {
    current.is_terminal() && previous != current
}

fn render(product_name: &str, tx: &Transaction) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Transaction Status</title>
  </head>
  <body>
    <h2>Product payment :</h2>
    <ul style="list-style-type:none;">
      <li>Order : {}</li>
      <li>Name : {}</li>
      <li>Total payment: Rp.{}</li>
      <li>Status : <b>{}</b></li>
    </ul>
  </body>
</html>"#,
        tx.id,
        escape_html(product_name),
        tx.price,
        tx.status
    )
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
