#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use hotel_search::catalog::store::SqliteStore;
use hotel_search::catalog::Catalog;
use hotel_search::config::ServiceConfig;
use hotel_search::embedding::hashed::HashedEmbeddingProvider;
use hotel_search::embedding::EmbeddingProvider;

pub const BEACHFRONT: &str = "Beachfront hotel with spa, gym, and ocean view.";
pub const MOUNTAIN: &str = "Mountain lodge with fireplace and hiking trails.";

/// Fresh in-memory store with schema and migrations applied.
pub fn test_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::in_memory().unwrap())
}

/// Deterministic offline provider.
pub fn hashed() -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashedEmbeddingProvider::new(256))
}

/// Config with short deadlines so timeout tests finish quickly.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.storage.timeout_ms = 5_000;
    config.embedding.timeout_ms = 5_000;
    config.embedding.provider = "hashed".into();
    config.embedding.dimensions = 256;
    config
}

pub fn test_catalog() -> (Catalog, Arc<SqliteStore>) {
    catalog_with(hashed(), test_config())
}

pub fn catalog_with(
    provider: Arc<dyn EmbeddingProvider>,
    config: ServiceConfig,
) -> (Catalog, Arc<SqliteStore>) {
    let store = test_store();
    let catalog = Catalog::new(store.clone(), provider, &config);
    (catalog, store)
}

/// Returns one vector fewer than it was sent.
pub struct ShortProvider;

impl EmbeddingProvider for ShortProvider {
    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(vec![vec![0.5; 8]; texts.len().saturating_sub(1)])
    }
    fn dimensions(&self) -> usize {
        8
    }
    fn model_name(&self) -> &str {
        "short"
    }
}

/// Always fails, as an unreachable model service would.
pub struct FailingProvider;

impl EmbeddingProvider for FailingProvider {
    fn embed_batch(&self, _texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("model service unavailable")
    }
    fn dimensions(&self) -> usize {
        8
    }
    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Sleeps before delegating to the hashed provider.
pub struct SlowProvider {
    pub delay: Duration,
    pub inner: HashedEmbeddingProvider,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: HashedEmbeddingProvider::new(256),
        }
    }
}

impl EmbeddingProvider for SlowProvider {
    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        std::thread::sleep(self.delay);
        self.inner.embed_batch(texts)
    }
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
    fn model_name(&self) -> &str {
        "hashed"
    }
}
