use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, StoreResult, TransactionStore};
use crate::models::{Customer, StatusChange, Transaction, TransactionStatus, Transition};

#[derive(Debug, Clone)]
struct Row {
    tx: Transaction,
    deleted: bool,
}

/// A thread-safe in-memory transaction store.
///
/// Every mutation takes the write lock, which gives the same per-row
/// serialization the Postgres store gets from `SELECT .. FOR UPDATE`.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    rows: Arc<RwLock<HashMap<i32, Row>>>,
    customers: Arc<RwLock<HashMap<i32, Customer>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_customer(&self, customer: Customer) {
        self.customers.write().await.insert(customer.id, customer);
    }

    /// Number of rows ever inserted, deleted ones included.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, tx: &Transaction) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&tx.id) {
            return Err(StoreError::Duplicate(tx.id));
        }
        rows.insert(
            tx.id,
            Row {
                tx: tx.clone(),
                deleted: false,
            },
        );
        Ok(())
    }

    async fn exists(&self, id: i32) -> StoreResult<bool> {
        Ok(self.rows.read().await.contains_key(&id))
    }

    async fn get_by_id(&self, id: i32) -> StoreResult<Option<Transaction>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&id).filter(|r| !r.deleted).map(|r| r.tx.clone()))
    }

    async fn list_by_user(&self, user_id: i32) -> StoreResult<Vec<Transaction>> {
        let rows = self.rows.read().await;
        let mut found: Vec<Transaction> = rows
            .values()
            .filter(|r| !r.deleted && r.tx.user_id == user_id)
            .map(|r| r.tx.clone())
            .collect();
        found.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn apply_status(
        &self,
        id: i32,
        status: TransactionStatus,
    ) -> StoreResult<Option<StatusChange>> {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.get_mut(&id).filter(|r| !r.deleted) else {
            return Ok(None);
        };

        let previous = row.tx.status;
        let transition = previous.transition_to(status);
        if transition == Transition::Applied {
            row.tx.status = status;
        }

        Ok(Some(StatusChange {
            previous,
            transition,
            transaction: row.tx.clone(),
        }))
    }

    async fn soft_delete(&self, id: i32) -> StoreResult<Option<Transaction>> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id).filter(|r| !r.deleted) {
            Some(row) => {
                row.deleted = true;
                Ok(Some(row.tx.clone()))
            }
            None => Ok(None),
        }
    }

    async fn customer(&self, user_id: i32) -> StoreResult<Option<Customer>> {
        Ok(self.customers.read().await.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pending(id: i32) -> Transaction {
        Transaction::pending(id, 7, 25000, 30, Utc::now())
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_ids() {
        let store = InMemoryTransactionStore::new();
        store.insert(&pending(5)).await.unwrap();

        let err = store.insert(&pending(5)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(5)));
    }

    #[tokio::test]
    async fn test_apply_status_keeps_terminal_state() {
        let store = InMemoryTransactionStore::new();
        store.insert(&pending(5)).await.unwrap();

        let first = store
            .apply_status(5, TransactionStatus::Success)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.previous, TransactionStatus::Pending);
        assert_eq!(first.transition, Transition::Applied);
        assert!(first.entered_terminal());

        let late = store
            .apply_status(5, TransactionStatus::Pending)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(late.transition, Transition::Rejected);
        assert_eq!(late.transaction.status, TransactionStatus::Success);
    }

    #[tokio::test]
    async fn test_soft_deleted_ids_stay_reserved() {
        let store = InMemoryTransactionStore::new();
        store.insert(&pending(9)).await.unwrap();

        assert!(store.soft_delete(9).await.unwrap().is_some());
        assert!(store.get_by_id(9).await.unwrap().is_none());
        assert!(store.exists(9).await.unwrap());
        assert!(store.insert(&pending(9)).await.is_err());
        assert!(store.apply_status(9, TransactionStatus::Success).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_order_ref_lookup() {
        let store = InMemoryTransactionStore::new();
        store.insert(&pending(-12)).await.unwrap();

        assert!(store.get_by_order_ref("-12").await.unwrap().is_some());
        assert!(store.get_by_order_ref("13").await.unwrap().is_none());
        assert!(store.get_by_order_ref("order-13").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_order_ref_lookup_is_exact() {
        let store = InMemoryTransactionStore::new();
        store.insert(&pending(5)).await.unwrap();

        assert!(store.get_by_order_ref("5").await.unwrap().is_some());
        for variant in [" 5", "5 ", "+5", "005"] {
            assert!(
                store.get_by_order_ref(variant).await.unwrap().is_none(),
                "{:?}",
                variant
            );
        }
    }
}
