use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use crate::utils::error::AppError;

/// Transaction id from the `:id` path segment. Unparsable ids are reported
/// through [`AppError::ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionId(pub i32);

#[async_trait]
impl<S> FromRequestParts<S> for TransactionId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                AppError::ValidationError(format!("Invalid transaction id: {}", rejection.body_text()))
            })?;
        Ok(TransactionId(id))
    }
}
