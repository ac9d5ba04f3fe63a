//! HTTP server initialization.
//!
//! [`open_catalog`] wires the database and embedding provider into a
//! [`Catalog`]; [`serve`] binds the axum router and runs until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::catalog::store::{AnnotationStore, SqliteStore};
use crate::catalog::Catalog;
use crate::config::ServiceConfig;
use crate::embedding::{self, EmbeddingProvider};
use crate::routes::{self, AppState};

/// Open the configured database and embedding provider.
///
/// Warns when the stored vectors were produced by a different model than the
/// one configured.
pub fn open_catalog(config: &ServiceConfig) -> Result<Catalog> {
    let db_path = config.resolved_db_path();
    let store = SqliteStore::open(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let provider: Arc<dyn EmbeddingProvider> = Arc::from(
        embedding::create_provider(&config.embedding)
            .context("failed to create embedding provider")?,
    );
    tracing::info!(
        provider = %config.embedding.provider,
        model = provider.model_name(),
        dimensions = provider.dimensions(),
        "embedding provider ready"
    );

    if let Ok(Some(stored)) = store.embedding_model() {
        if stored != provider.model_name() {
            tracing::warn!(
                stored = %stored,
                configured = provider.model_name(),
                "embedding model changed, run `hotel-search enrol` to recompute stored vectors"
            );
        }
    }

    Ok(Catalog::new(Arc::new(store), provider, config))
}

/// Serve the HTTP API until Ctrl-C.
pub async fn serve(config: ServiceConfig) -> Result<()> {
    let bind_addr = config.bind_addr();
    let catalog = open_catalog(&config)?;
    let router = routes::router(AppState::new(catalog));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "hotel search listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
