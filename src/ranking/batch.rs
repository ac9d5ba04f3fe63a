//! Batch embedding coordinator.
//!
//! Callers hand over texts in whatever grouping they have (one query, a flat
//! candidate list, or per-hotel annotation lists). The coordinator flattens them
//! into a single provider call, checks that exactly one vector came back per
//! text, and restores the original grouping.

use std::sync::Arc;
use std::time::Duration;

use crate::deadline::{run_blocking, Stage};
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, SearchError};

/// A query vector plus corpus vectors in the caller's grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedCorpus {
    pub query: Vec<f32>,
    pub groups: Vec<Vec<Vec<f32>>>,
}

/// Embed a flat list of texts in one provider call, bounded by `limit`.
///
/// Fails with [`SearchError::BatchSizeMismatch`] if the provider returns any other
/// number of vectors than it was sent.
pub async fn embed_texts(
    provider: Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
    limit: Duration,
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(vec![]);
    }
    let expected = texts.len();
    let vectors = run_blocking(Stage::Embedding, limit, move || {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        provider
            .embed_batch(&refs)
            .map_err(|e| SearchError::EmbeddingProvider(format!("{e:#}")))
    })
    .await?;

    if vectors.len() != expected {
        tracing::error!(expected, actual = vectors.len(), "provider broke the batch contract");
        return Err(SearchError::BatchSizeMismatch {
            expected,
            actual: vectors.len(),
        });
    }
    Ok(vectors)
}

/// Embed grouped texts with one provider call and return vectors in the same grouping.
pub async fn embed_grouped(
    provider: Arc<dyn EmbeddingProvider>,
    grouped: &[Vec<String>],
    limit: Duration,
) -> Result<Vec<Vec<Vec<f32>>>> {
    let sizes: Vec<usize> = grouped.iter().map(Vec::len).collect();
    let flat: Vec<String> = grouped.iter().flatten().cloned().collect();
    let vectors = embed_texts(provider, flat, limit).await?;
    regroup(vectors, &sizes)
}

/// Embed the query and every corpus text together in one provider call.
///
/// The query travels as the first element of the batch.
pub async fn embed_query_and_corpus(
    provider: Arc<dyn EmbeddingProvider>,
    query: &str,
    grouped: &[Vec<String>],
    limit: Duration,
) -> Result<EmbeddedCorpus> {
    let sizes: Vec<usize> = grouped.iter().map(Vec::len).collect();
    let mut batch = Vec::with_capacity(1 + sizes.iter().sum::<usize>());
    batch.push(query.to_string());
    batch.extend(grouped.iter().flatten().cloned());

    let mut vectors = embed_texts(provider, batch, limit).await?.into_iter();
    let query = vectors
        .next()
        .ok_or(SearchError::BatchSizeMismatch {
            expected: 1,
            actual: 0,
        })?;
    let groups = regroup(vectors.collect(), &sizes)?;

    Ok(EmbeddedCorpus { query, groups })
}

/// Split a flat vector list back into groups of the given sizes, preserving order.
pub fn regroup<T>(flat: Vec<T>, sizes: &[usize]) -> Result<Vec<Vec<T>>> {
    let expected: usize = sizes.iter().sum();
    if flat.len() != expected {
        return Err(SearchError::BatchSizeMismatch {
            expected,
            actual: flat.len(),
        });
    }

    let mut rest = flat.into_iter();
    Ok(sizes
        .iter()
        .map(|&n| rest.by_ref().take(n).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::hashed::HashedEmbeddingProvider;

    /// Returns one vector fewer than requested.
    struct ShortProvider;

    impl EmbeddingProvider for ShortProvider {
        fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
        }
        fn dimensions(&self) -> usize {
            2
        }
        fn model_name(&self) -> &str {
            "short"
        }
    }

    struct FailingProvider;

    impl EmbeddingProvider for FailingProvider {
        fn embed_batch(&self, _texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            anyhow::bail!("model service unavailable")
        }
        fn dimensions(&self) -> usize {
            2
        }
        fn model_name(&self) -> &str {
            "failing"
        }
    }

    /// Records the size of every batch it receives.
    struct CountingProvider {
        calls: std::sync::Mutex<Vec<usize>>,
    }

    impl EmbeddingProvider for CountingProvider {
        fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            self.calls.lock().unwrap().push(texts.len());
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
        fn dimensions(&self) -> usize {
            2
        }
        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn grouped() -> Vec<Vec<String>> {
        vec![
            vec!["a".into(), "bb".into()],
            vec!["ccc".into()],
            vec!["dddd".into(), "eeeee".into(), "ffffff".into()],
        ]
    }

    const LIMIT: Duration = Duration::from_secs(5);

    #[test]
    fn regroup_restores_boundaries() {
        let groups = regroup(vec![1, 2, 3, 4, 5, 6], &[2, 1, 3]).unwrap();
        assert_eq!(groups, vec![vec![1, 2], vec![3], vec![4, 5, 6]]);
    }

    #[test]
    fn regroup_handles_empty_groups() {
        let groups = regroup(vec![1, 2], &[0, 2, 0]).unwrap();
        assert_eq!(groups, vec![vec![], vec![1, 2], vec![]]);
    }

    #[test]
    fn regroup_rejects_wrong_total() {
        let err = regroup(vec![1, 2, 3], &[2, 2]).unwrap_err();
        assert!(matches!(
            err,
            SearchError::BatchSizeMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn query_and_corpus_use_one_call() {
        let provider = Arc::new(CountingProvider {
            calls: std::sync::Mutex::new(vec![]),
        });
        let embedded = embed_query_and_corpus(provider.clone(), "q", &grouped(), LIMIT)
            .await
            .unwrap();

        assert_eq!(*provider.calls.lock().unwrap(), vec![7]);
        assert_eq!(embedded.query, vec![1.0, 1.0]);
        let lens: Vec<Vec<f32>> = embedded
            .groups
            .iter()
            .map(|g| g.iter().map(|v| v[0]).collect())
            .collect();
        assert_eq!(lens, vec![vec![1.0, 2.0], vec![3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[tokio::test]
    async fn grouped_embedding_matches_single_calls() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashedEmbeddingProvider::new(32));
        let groups = embed_grouped(provider.clone(), &grouped(), LIMIT).await.unwrap();
        assert_eq!(groups[2][1], provider.embed("eeeee").unwrap());
    }

    #[tokio::test]
    async fn short_response_is_batch_size_mismatch() {
        let err = embed_query_and_corpus(Arc::new(ShortProvider), "q", &grouped(), LIMIT)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SearchError::BatchSizeMismatch {
                expected: 7,
                actual: 6
            }
        ));

        let err = embed_grouped(Arc::new(ShortProvider), &grouped(), LIMIT)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::BatchSizeMismatch { .. }));
    }

    #[tokio::test]
    async fn provider_failure_is_not_retried() {
        let err = embed_texts(Arc::new(FailingProvider), vec!["spa".into()], LIMIT)
            .await
            .unwrap_err();
        match err {
            SearchError::EmbeddingProvider(msg) => assert!(msg.contains("unavailable")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_input_skips_provider() {
        let vectors = embed_texts(Arc::new(FailingProvider), vec![], LIMIT)
            .await
            .unwrap();
        assert!(vectors.is_empty());
    }
}
