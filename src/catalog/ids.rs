//! Hotel id allocation.

use std::sync::Arc;

use crate::catalog::store::AnnotationStore;
use crate::error::Result;

/// Hands out strictly increasing hotel ids from a named counter in the store.
///
/// Holds no in-process state: every allocation is the store's atomic
/// increment-and-fetch, so allocators in separate processes sharing one
/// database never observe the same value.
pub struct IdAllocator {
    store: Arc<dyn AnnotationStore>,
    counter: String,
}

impl IdAllocator {
    pub fn new(store: Arc<dyn AnnotationStore>, counter: impl Into<String>) -> Self {
        Self {
            store,
            counter: counter.into(),
        }
    }

    /// Next id. The first call against a fresh counter returns 1.
    pub fn next_id(&self) -> Result<i64> {
        let id = self.store.atomic_increment_counter(&self.counter)?;
        tracing::debug!(counter = %self.counter, id, "allocated id");
        Ok(id)
    }

    /// Set the counter back to 0 so the next id is 1.
    ///
    /// Ids issued before the reset stay valid; reusing them is the caller's problem.
    pub fn reset(&self) -> Result<()> {
        self.store.reset_counter(&self.counter)?;
        tracing::info!(counter = %self.counter, "id counter reset");
        Ok(())
    }
}
