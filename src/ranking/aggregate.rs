//! Per-hotel score aggregation and ordering.
//!
//! Scores arrive as one flat list aligned with the concatenation of every
//! hotel's annotations. Each hotel's contiguous window is reduced to a
//! (mean, max) pair, and hotels are ordered by max descending. Ties keep input
//! order.

use serde::{Deserialize, Serialize};

use crate::catalog::types::Hotel;
use crate::error::{Result, SearchError};

/// One ranked hotel. Derived per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    pub hotel_id: i64,
    pub annotations: Vec<String>,
    pub mean_similarity: f32,
    pub max_similarity: f32,
}

/// Reduce flat per-annotation scores to per-hotel results ranked by max similarity.
pub fn aggregate_and_rank(hotels: &[Hotel], flat_scores: &[f32]) -> Result<Vec<AggregatedResult>> {
    let mut results = aggregate(hotels, flat_scores)?;
    rank(&mut results);
    Ok(results)
}

/// Reduce flat per-annotation scores to per-hotel results, in input order.
pub fn aggregate(hotels: &[Hotel], flat_scores: &[f32]) -> Result<Vec<AggregatedResult>> {
    let total: usize = hotels.iter().map(|h| h.annotations.len()).sum();
    if total != flat_scores.len() {
        tracing::error!(
            annotations = total,
            scores = flat_scores.len(),
            "score list is not aligned with annotations"
        );
        return Err(SearchError::Alignment {
            annotations: total,
            scores: flat_scores.len(),
        });
    }

    let mut results = Vec::with_capacity(hotels.len());
    let mut offset = 0;
    for hotel in hotels {
        let window = &flat_scores[offset..offset + hotel.annotations.len()];
        offset += window.len();
        let (mean_similarity, max_similarity) =
            mean_and_max(window).ok_or(SearchError::EmptyAnnotationSet {
                hotel_id: hotel.hotel_id,
            })?;
        results.push(AggregatedResult {
            hotel_id: hotel.hotel_id,
            annotations: hotel.annotations.clone(),
            mean_similarity,
            max_similarity,
        });
    }

    Ok(results)
}

/// Stable sort by max similarity, descending.
pub fn rank(results: &mut [AggregatedResult]) {
    results.sort_by(|a, b| b.max_similarity.total_cmp(&a.max_similarity));
}

fn mean_and_max(window: &[f32]) -> Option<(f32, f32)> {
    if window.is_empty() {
        return None;
    }
    let sum: f64 = window.iter().map(|&s| s as f64).sum();
    let max = window.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    Some(((sum / window.len() as f64) as f32, max))
}
