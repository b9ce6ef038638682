pub mod transaction;
pub mod user;

pub use transaction::{StatusChange, Transaction, TransactionStatus, Transition};
pub use user::Customer;
