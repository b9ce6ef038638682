use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a transaction.
///
/// `Pending` is the only non-terminal state. Once a transaction reaches
/// `Success` or `Failed` it stays there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Error)]
#[error("unknown transaction status '{0}'")]
pub struct UnknownStatus(pub String);

/// Outcome of asking a status to move to another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// The status changed.
    Applied,
    /// The requested status equals the current one.
    Unchanged,
    /// The current status is terminal and differs from the requested one.
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Success | TransactionStatus::Failed)
    }

    /// Pure transition rule shared by every store implementation.
    pub fn transition_to(self, next: TransactionStatus) -> Transition {
        if self == next {
            Transition::Unchanged
        } else if self.is_terminal() {
            Transition::Rejected
        } else {
            Transition::Applied
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i32,
    pub user_id: i32,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub price: i64,
    pub status: TransactionStatus,
}

impl Transaction {
    /// Builds a fresh pending transaction starting at `now`.
    pub fn pending(id: i32, user_id: i32, price: i64, term_days: i64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            start_date: now,
            due_date: now + Duration::days(term_days),
            price,
            status: TransactionStatus::Pending,
        }
    }

    /// The external order reference sent to the payment gateway.
    pub fn order_ref(&self) -> String {
        self.id.to_string()
    }
}

/// Result of an atomic status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub previous: TransactionStatus,
    pub transition: Transition,
    pub transaction: Transaction,
}

impl StatusChange {
    /// True when this change moved a transaction into a terminal state.
    pub fn entered_terminal(&self) -> bool {
        self.transition == Transition::Applied && self.transaction.status.is_terminal()
    }
}
