//! Subscription transaction orchestration.
//!
//! Creation allocates an id, persists a pending row and then asks the payment
//! gateway for a hosted checkout session. The gateway call happens after the
//! insert has committed: a gateway failure leaves the pending row in place so
//! the session can be requested again for the same order.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::BillingConfig;
use crate::gateway::{GatewaySession, PaymentGateway, SessionRequest};
use crate::models::{Customer, Transaction, TransactionStatus};
use crate::services::allocator::IdentifierAllocator;
use crate::store::{StoreError, TransactionStoreBox};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct CreatedTransaction {
    pub transaction: Transaction,
    pub session: GatewaySession,
}

pub struct TransactionService {
    store: TransactionStoreBox,
    gateway: Arc<dyn PaymentGateway>,
    allocator: IdentifierAllocator,
    billing: BillingConfig,
}

impl TransactionService {
    pub fn new(
        store: TransactionStoreBox,
        gateway: Arc<dyn PaymentGateway>,
        allocator: IdentifierAllocator,
        billing: BillingConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            allocator,
            billing,
        }
    }

    pub async fn create(&self, user_id: i32) -> Result<CreatedTransaction, AppError> {
        let customer = self.customer(user_id).await?;
        let transaction = self.insert_pending(user_id).await?;

        info!(
            order_id = transaction.id,
            user_id,
            price = transaction.price,
            "Pending transaction created"
        );

        let session = self.open_session(&transaction, &customer).await?;
        Ok(CreatedTransaction {
            transaction,
            session,
        })
    }

    pub async fn list(&self, user_id: i32) -> Result<Vec<Transaction>, AppError> {
        Ok(self.store.list_by_user(user_id).await?)
    }

    pub async fn get(&self, user_id: i32, id: i32) -> Result<Transaction, AppError> {
        match self.store.get_by_id(id).await? {
            Some(tx) if tx.user_id == user_id => Ok(tx),
            _ => Err(AppError::NotFound(format!("Transaction {} was not found", id))),
        }
    }

    /// Requests a new checkout session for a transaction that is still pending.
    pub async fn renew_session(&self, user_id: i32, id: i32) -> Result<CreatedTransaction, AppError> {
        let transaction = self.get(user_id, id).await?;
        if transaction.status != TransactionStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Transaction {} is already {}",
                id, transaction.status
            )));
        }

        let customer = self.customer(user_id).await?;
        let session = self.open_session(&transaction, &customer).await?;
        Ok(CreatedTransaction {
            transaction,
            session,
        })
    }

    /// Soft delete. The id stays reserved so it is never reissued.
    pub async fn delete(&self, user_id: i32, id: i32) -> Result<Transaction, AppError> {
        self.get(user_id, id).await?;
        let deleted = self
            .store
            .soft_delete(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} was not found", id)))?;

        info!(order_id = id, user_id, "Transaction deleted");
        Ok(deleted)
    }

    async fn customer(&self, user_id: i32) -> Result<Customer, AppError> {
        self.store
            .customer(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} was not found", user_id)))
    }

    async fn insert_pending(&self, user_id: i32) -> Result<Transaction, AppError> {
        let mut attempts = 0;
        loop {
            let id = self.allocator.allocate(self.store.as_ref(), &mut attempts).await?;
            let transaction = Transaction::pending(
                id,
                user_id,
                self.billing.price,
                self.billing.term_days,
                Utc::now(),
            );

            match self.store.insert(&transaction).await {
                Ok(()) => return Ok(transaction),
                // Lost a race with a concurrent create.
                Err(StoreError::Duplicate(id)) => {
                    debug!(candidate = id, attempt = attempts, "Insert hit a taken id, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn open_session(
        &self,
        transaction: &Transaction,
        customer: &Customer,
    ) -> Result<GatewaySession, AppError> {
        let request = SessionRequest {
            order_id: transaction.order_ref(),
            amount: transaction.price,
            customer_name: customer.full_name.clone(),
            customer_email: customer.email.clone(),
        };

        self.gateway
            .create_session(&request)
            .await
            .map_err(|source| AppError::Gateway {
                order_id: transaction.id,
                source,
            })
    }
}
