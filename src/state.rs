use std::sync::Arc;

use crate::services::{NotificationProcessor, TransactionService};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub transactions: Arc<TransactionService>,
    pub notifications: Arc<NotificationProcessor>,
}

impl AppState {
    pub fn new(transactions: TransactionService, notifications: NotificationProcessor) -> Self {
        Self {
            transactions: Arc::new(transactions),
            notifications: Arc::new(notifications),
        }
    }
}
