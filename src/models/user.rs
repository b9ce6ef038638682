use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Contact details of the user paying for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: i32,
    pub full_name: String,
    pub email: String,
}
