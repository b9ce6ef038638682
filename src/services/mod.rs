pub mod allocator;
pub mod notification;
pub mod transaction;

pub use allocator::IdentifierAllocator;
pub use notification::{
    expected_status_code, resolve_status, NotificationOutcome, NotificationPayload, NotificationProcessor,
    SignatureVerifier,
};
pub use transaction::{CreatedTransaction, TransactionService};
