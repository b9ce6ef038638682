use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::debug;

use super::{StoreError, StoreResult, TransactionStore};
use crate::models::{Customer, StatusChange, Transaction, TransactionStatus, Transition};

const TRANSACTION_COLUMNS: &str = "id, user_id, start_date, due_date, price, status";

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: i32,
    user_id: i32,
    start_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    price: i64,
    status: String,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<TransactionStatus>()
            .map_err(|e| StoreError::Corrupt(format!("transaction {}: {}", row.id, e)))?;

        Ok(Transaction {
            id: row.id,
            user_id: row.user_id,
            start_date: row.start_date,
            due_date: row.due_date,
            price: row.price,
            status,
        })
    }
}

/// Postgres-backed store. Uniqueness comes from the primary key and status
/// updates serialize on a row lock.
#[derive(Clone)]
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn insert(&self, tx: &Transaction) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, start_date, due_date, price, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(tx.id)
        .bind(tx.user_id)
        .bind(tx.start_date)
        .bind(tx.due_date)
        .bind(tx.price)
        .bind(tx.status.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Duplicate(tx.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, id: i32) -> StoreResult<bool> {
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM transactions WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(found)
    }

    async fn get_by_id(&self, id: i32) -> StoreResult<Option<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE id = $1 AND deleted_at IS NULL",
            TRANSACTION_COLUMNS
        );
        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: i32) -> StoreResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE user_id = $1 AND deleted_at IS NULL \
             ORDER BY start_date DESC, id DESC",
            TRANSACTION_COLUMNS
        );
        let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn apply_status(
        &self,
        id: i32,
        status: TransactionStatus,
    ) -> StoreResult<Option<StatusChange>> {
        let mut db_tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {} FROM transactions WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            TRANSACTION_COLUMNS
        );
        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *db_tx)
            .await?;

        let Some(row) = row else {
            db_tx.rollback().await?;
            return Ok(None);
        };

        let mut transaction = Transaction::try_from(row)?;
        let previous = transaction.status;
        let transition = previous.transition_to(status);

        if transition == Transition::Applied {
            sqlx::query("UPDATE transactions SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(status.as_str())
                .bind(id)
                .execute(&mut *db_tx)
                .await?;
            transaction.status = status;
        }

        db_tx.commit().await?;
        debug!(order_id = id, %previous, requested = %status, ?transition, "Status update evaluated");

        Ok(Some(StatusChange {
            previous,
            transition,
            transaction,
        }))
    }

    async fn soft_delete(&self, id: i32) -> StoreResult<Option<Transaction>> {
        let sql = format!(
            "UPDATE transactions SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
            TRANSACTION_COLUMNS
        );
        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn customer(&self, user_id: i32) -> StoreResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, full_name, email FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }
}
