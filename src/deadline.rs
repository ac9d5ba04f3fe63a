//! Deadline-bounded execution of blocking work (SQLite calls, model inference).
//!
//! The work runs on the blocking pool. If the deadline passes first, the caller
//! gets a timeout error immediately; the detached blocking task runs to
//! completion but its result is discarded.

use std::time::Duration;

use crate::error::{Result, SearchError};

/// Which collaborator the blocking work talks to, for error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    Storage,
}

impl Stage {
    fn timed_out(self, limit: Duration) -> SearchError {
        let after_ms = limit.as_millis() as u64;
        match self {
            Stage::Embedding => SearchError::EmbeddingTimeout { after_ms },
            Stage::Storage => SearchError::StorageTimeout { after_ms },
        }
    }

    fn crashed(self, msg: String) -> SearchError {
        match self {
            Stage::Embedding => SearchError::EmbeddingProvider(msg),
            Stage::Storage => SearchError::Storage(msg),
        }
    }
}

/// Run `f` on the blocking pool, failing with the stage's timeout error after `limit`.
pub async fn run_blocking<T, F>(stage: Stage, limit: Duration, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(stage.crashed(format!("blocking task failed: {join_err}"))),
        Err(_) => {
            tracing::warn!(?stage, limit_ms = limit.as_millis() as u64, "deadline exceeded");
            Err(stage.timed_out(limit))
        }
    }
}
