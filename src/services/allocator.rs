use std::ops::RangeInclusive;

use rand::Rng;
use tracing::debug;

use crate::store::TransactionStore;
use crate::utils::error::AppError;

/// Candidate ids are drawn from this range. Zero is never issued.
pub const DEFAULT_ID_RANGE: RangeInclusive<i32> = -99..=9999;

/// Rejection-sampling allocator for transaction ids.
///
/// A candidate is only a hint: the store's uniqueness constraint is the
/// final arbiter, and callers retry on a duplicate insert using the same
/// attempt counter.
#[derive(Debug, Clone)]
pub struct IdentifierAllocator {
    range: RangeInclusive<i32>,
    max_attempts: u32,
}

impl IdentifierAllocator {
    pub fn new(max_attempts: u32) -> Self {
        Self::with_range(DEFAULT_ID_RANGE, max_attempts)
    }

    pub fn with_range(range: RangeInclusive<i32>, max_attempts: u32) -> Self {
        Self {
            range,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Draws candidates until one is free in `store`, counting every draw
    /// in `attempts`.
    pub async fn allocate(
        &self,
        store: &dyn TransactionStore,
        attempts: &mut u32,
    ) -> Result<i32, AppError> {
        while *attempts < self.max_attempts {
            *attempts += 1;
            let candidate = rand::thread_rng().gen_range(self.range.clone());
            if candidate == 0 {
                continue;
            }
            if !store.exists(candidate).await? {
                return Ok(candidate);
            }
            debug!(candidate, attempt = *attempts, "Transaction id in use, drawing again");
        }

        Err(AppError::AllocationExhausted {
            attempts: self.max_attempts,
        })
    }
}
