//! The hotel catalog: storage, id allocation, and the read/write operations
//! the HTTP surface and CLI call.
//!
//! [`Catalog`] is an explicit handle over one store and one embedding provider.
//! Store calls run on the blocking pool under the storage deadline; embedding
//! calls run under the embedding deadline.

pub mod ids;
pub mod seed;
pub mod store;
pub mod types;
pub mod write;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ServiceConfig;
use crate::deadline::{run_blocking, Stage};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::ranking::aggregate::AggregatedResult;
use crate::ranking::{self, CorpusSource, RankTimings};

use ids::IdAllocator;
use store::AnnotationStore;
use types::Hotel;

/// Ranked results plus the timing breakdown reported to callers.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<AggregatedResult>,
    /// Wall-clock time of the whole search.
    pub total: Duration,
    /// Time spent reading the catalog snapshot.
    pub snapshot: Duration,
    pub timings: RankTimings,
    pub freshly_embedded: usize,
}

pub struct Catalog {
    store: Arc<dyn AnnotationStore>,
    provider: Arc<dyn EmbeddingProvider>,
    ids: Arc<IdAllocator>,
    storage_timeout: Duration,
    embedding_timeout: Duration,
    default_populate_count: usize,
    annotations_per_hotel: usize,
}

impl Catalog {
    pub fn new(
        store: Arc<dyn AnnotationStore>,
        provider: Arc<dyn EmbeddingProvider>,
        config: &ServiceConfig,
    ) -> Self {
        let ids = Arc::new(IdAllocator::new(
            Arc::clone(&store),
            config.storage.counter_name.clone(),
        ));
        Self {
            store,
            provider,
            ids,
            storage_timeout: config.storage.timeout(),
            embedding_timeout: config.embedding.timeout(),
            default_populate_count: config.populate.default_count,
            annotations_per_hotel: config.populate.annotations_per_hotel,
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// Run a store call on the blocking pool under the storage deadline.
    pub(crate) async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn AnnotationStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        run_blocking(Stage::Storage, self.storage_timeout, move || f(store.as_ref())).await
    }

    /// Point-in-time read of every hotel, ordered by id.
    pub async fn snapshot(&self) -> Result<Vec<Hotel>> {
        self.with_store(|store| store.find_all()).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.with_store(|store| store.count()).await
    }

    /// Rank the whole catalog against `query`.
    pub async fn search(&self, query: &str, source: CorpusSource) -> Result<SearchOutcome> {
        let start = Instant::now();
        let hotels = self.snapshot().await?;
        let snapshot = start.elapsed();

        let ranking = ranking::rank_snapshot(
            Arc::clone(&self.provider),
            query,
            &hotels,
            source,
            self.embedding_timeout,
        )
        .await?;

        let total = start.elapsed();
        tracing::debug!(
            hotels = hotels.len(),
            ?source,
            total_ms = total.as_millis() as u64,
            snapshot_ms = snapshot.as_millis() as u64,
            "search complete"
        );

        Ok(SearchOutcome {
            results: ranking.results,
            total,
            snapshot,
            timings: ranking.timings,
            freshly_embedded: ranking.freshly_embedded,
        })
    }

    /// Similarity of `query` to each candidate text, in candidate order.
    pub async fn compare(&self, query: &str, candidates: Vec<String>) -> Result<Vec<f32>> {
        ranking::compare_texts(
            Arc::clone(&self.provider),
            query,
            candidates,
            self.embedding_timeout,
        )
        .await
    }
}
