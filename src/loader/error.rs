use std::sync::Arc;
use thiserror::Error;

use crate::database::StoreError;

// Outcome of a single `load` call
pub type LoadResult<V> = Result<V, LoadError>;

// Failure delivered to loader waiters. Cloned once per waiter, so the store
// error is shared behind an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    // The whole batch failed; every waiter of the dispatch gets this
    #[error("batch fetch failed: {0}")]
    Fetch(Arc<StoreError>),

    // One key could not be turned into its entity
    #[error("failed to decode record {key}: {reason}")]
    Decode { key: i32, reason: String },

    // The dispatch was torn down before it produced a result
    #[error("loader dispatch was cancelled")]
    Cancelled,
}

impl From<StoreError> for LoadError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Decode { key, reason } => LoadError::Decode { key, reason },
            other => LoadError::Fetch(Arc::new(other)),
        }
    }
}
