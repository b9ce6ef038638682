//! Durable record of transactions.
//!
//! The store is the single source of truth for id uniqueness and for the
//! status state machine: `insert` must reject duplicate ids and
//! `apply_status` must evaluate and write the transition atomically per row.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Customer, StatusChange, Transaction, TransactionStatus};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryTransactionStore;
pub use postgres::PgTransactionStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transaction id {0} is already in use")]
    Duplicate(i32),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert(&self, tx: &Transaction) -> StoreResult<()>;

    /// Existence probe used by the identifier allocator. Soft-deleted rows
    /// still count as existing.
    async fn exists(&self, id: i32) -> StoreResult<bool>;

    async fn get_by_id(&self, id: i32) -> StoreResult<Option<Transaction>>;

    /// Resolves the gateway's order reference to a transaction. Only the
    /// exact form produced by [`Transaction::order_ref`] matches.
    async fn get_by_order_ref(&self, order_ref: &str) -> StoreResult<Option<Transaction>> {
        match order_ref.parse::<i32>() {
            Ok(id) if id.to_string() == order_ref => self.get_by_id(id).await,
            _ => Ok(None),
        }
    }

    async fn list_by_user(&self, user_id: i32) -> StoreResult<Vec<Transaction>>;

    /// Moves a transaction to `status` under a per-row serialization point.
    /// Returns `None` when no live transaction has this id.
    async fn apply_status(&self, id: i32, status: TransactionStatus)
        -> StoreResult<Option<StatusChange>>;

    async fn soft_delete(&self, id: i32) -> StoreResult<Option<Transaction>>;

    async fn customer(&self, user_id: i32) -> StoreResult<Option<Customer>>;
}

pub type TransactionStoreBox = std::sync::Arc<dyn TransactionStore>;
