use axum::extract::State;
use axum::response::Response;

use crate::state::AppState;
use crate::utils::auth::AuthUser;
use crate::utils::error::AppError;
use crate::utils::extract::TransactionId;
use crate::utils::response::{created, success};

pub async fn create_transaction(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    let result = state.transactions.create(user.user_id).await?;
    Ok(created(result, "Transaction created"))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    let transactions = state.transactions.list(user.user_id).await?;
    Ok(success(transactions, "Transactions retrieved"))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    TransactionId(id): TransactionId,
) -> Result<Response, AppError> {
    let transaction = state.transactions.get(user.user_id, id).await?;
    Ok(success(transaction, "Transaction retrieved"))
}

pub async fn renew_session(
    State(state): State<AppState>,
    user: AuthUser,
    TransactionId(id): TransactionId,
) -> Result<Response, AppError> {
    let result = state.transactions.renew_session(user.user_id, id).await?;
    Ok(success(result, "Payment session created"))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    TransactionId(id): TransactionId,
) -> Result<Response, AppError> {
    let transaction = state.transactions.delete(user.user_id, id).await?;
    Ok(success(transaction, "Transaction deleted"))
}
