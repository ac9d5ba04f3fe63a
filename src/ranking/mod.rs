//! Embedding-based ranking engine.
//!
//! [`rank_snapshot`] scores a point-in-time snapshot of the catalog against a
//! free-text query: embed, compare with [`similarity::similarity`], reduce per
//! hotel with [`aggregate::aggregate`], then order with [`aggregate::rank`].
//! A ranking either completes for every hotel or fails as a whole.

pub mod aggregate;
pub mod batch;
pub mod similarity;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::catalog::types::Hotel;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use aggregate::AggregatedResult;

/// Where corpus vectors come from for a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusSource {
    /// Use persisted vectors; embed only hotels that have none.
    Stored,
    /// Re-embed every annotation in the snapshot.
    Fresh,
}

/// Wall-clock cost of each ranking stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankTimings {
    pub embedding: Duration,
    pub similarity: Duration,
    pub sort: Duration,
}

#[derive(Debug, Clone)]
pub struct Ranking {
    pub results: Vec<AggregatedResult>,
    pub timings: RankTimings,
    /// Hotels whose vectors were computed for this request rather than read from the store.
    pub freshly_embedded: usize,
}

/// Rank every hotel in `snapshot` against `query`.
///
/// An empty snapshot yields an empty ranking without calling the provider.
pub async fn rank_snapshot(
    provider: Arc<dyn EmbeddingProvider>,
    query: &str,
    snapshot: &[Hotel],
    source: CorpusSource,
    limit: Duration,
) -> Result<Ranking> {
    if snapshot.is_empty() {
        return Ok(Ranking {
            results: vec![],
            timings: RankTimings::default(),
            freshly_embedded: 0,
        });
    }

    let needs_fresh = |h: &Hotel| source == CorpusSource::Fresh || !h.is_enrolled();
    let pending: Vec<Vec<String>> = snapshot
        .iter()
        .filter(|h| needs_fresh(*h))
        .map(|h| h.annotations.clone())
        .collect();

    let embed_start = Instant::now();
    let (query_vec, fresh_groups) = if pending.is_empty() {
        let mut vectors =
            batch::embed_texts(provider, vec![query.to_string()], limit).await?;
        (vectors.remove(0), vec![])
    } else {
        let embedded = batch::embed_query_and_corpus(provider, query, &pending, limit).await?;
        (embedded.query, embedded.groups)
    };
    let embedding = embed_start.elapsed();

    let mut fresh = fresh_groups.iter();
    let mut corpus: Vec<&[f32]> = Vec::new();
    for hotel in snapshot {
        let vectors = if needs_fresh(hotel) {
            fresh.next()
        } else {
            hotel.embeddings.as_ref()
        };
        if let Some(vectors) = vectors {
            corpus.extend(vectors.iter().map(Vec::as_slice));
        }
    }

    let similarity_start = Instant::now();
    let scores = similarity::similarity(&query_vec, &corpus)?;
    let mut results = aggregate::aggregate(snapshot, &scores)?;
    let similarity = similarity_start.elapsed();

    let sort_start = Instant::now();
    aggregate::rank(&mut results);
    let sort = sort_start.elapsed();

    tracing::debug!(
        hotels = snapshot.len(),
        annotations = scores.len(),
        fresh = pending.len(),
        embedding_ms = embedding.as_millis() as u64,
        similarity_ms = similarity.as_millis() as u64,
        sort_ms = sort.as_millis() as u64,
        "ranking complete"
    );

    Ok(Ranking {
        results,
        timings: RankTimings {
            embedding,
            similarity,
            sort,
        },
        freshly_embedded: pending.len(),
    })
}

/// Similarity of `query` to each candidate text, aligned with `candidates`.
pub async fn compare_texts(
    provider: Arc<dyn EmbeddingProvider>,
    query: &str,
    candidates: Vec<String>,
    limit: Duration,
) -> Result<Vec<f32>> {
    if candidates.is_empty() {
        return Ok(vec![]);
    }
    let embedded = batch::embed_query_and_corpus(provider, query, &[candidates], limit).await?;
    similarity::similarity(&embedded.query, &embedded.groups[0])
}
