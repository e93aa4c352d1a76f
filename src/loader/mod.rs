// Request-scoped batching between GraphQL field resolvers and the store
pub mod batch;
pub mod entities;
pub mod error;

pub use batch::{BatchFn, BatchLoader};
pub use entities::{TodosByUserId, TodosByUserLoader, UserLoader, UsersByGroupId, UsersByGroupLoader, UsersById};
pub use error::{LoadError, LoadResult};

use std::time::Duration;

// Tuning shared by every loader of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    pub max_batch_size: usize, // Keys per dispatch before flushing early
    pub delay: Duration,       // Coalescing window after the first key of a batch
    pub cache_failures: bool,  // Whether failed keys stay failed for the rest of the request
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            max_batch_size: 200,
            delay: Duration::from_millis(1),
            cache_failures: false,
        }
    }
}
