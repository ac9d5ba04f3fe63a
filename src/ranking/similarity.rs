//! Cosine similarity, one query against a whole corpus.
//!
//! A zero-norm operand scores 0.0 rather than NaN. Scores are clamped to
//! `[-1, 1]` to absorb rounding on near-parallel vectors.

use ndarray::{Array2, ArrayView1, Axis};

use crate::error::{Result, SearchError};

/// Cosine similarity of `query` against every row of `corpus`, aligned by index.
///
/// All corpus vectors must have the query's length.
pub fn similarity<V: AsRef<[f32]>>(query: &[f32], corpus: &[V]) -> Result<Vec<f32>> {
    if corpus.is_empty() {
        return Ok(vec![]);
    }

    let dim = query.len();
    if let Some(bad) = corpus.iter().map(AsRef::as_ref).find(|v| v.len() != dim) {
        return Err(SearchError::DimensionMismatch {
            expected: dim,
            actual: bad.len(),
        });
    }

    let flat: Vec<f32> = corpus
        .iter()
        .flat_map(|v| v.as_ref().iter().copied())
        .collect();
    let matrix = Array2::from_shape_vec((corpus.len(), dim), flat).map_err(|_| {
        SearchError::DimensionMismatch {
            expected: dim,
            actual: 0,
        }
    })?;
    let q = ArrayView1::from(query);

    let dots = matrix.dot(&q);
    let row_norms = matrix.map_axis(Axis(1), |row| row.dot(&row).sqrt());
    let query_norm = q.dot(&q).sqrt();

    Ok(dots
        .iter()
        .zip(row_norms.iter())
        .map(|(&dot, &norm)| normalized(dot, query_norm * norm))
        .collect())
}

/// Pairwise cosine similarity. Vectors of different length score 0.0.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    normalized(dot, norm_a * norm_b)
}

fn normalized(dot: f32, denom: f32) -> f32 {
    if denom == 0.0 {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn query_against_many_is_index_aligned() {
        let query = vec![1.0f32, 0.0, 0.0];
        let corpus: Vec<Vec<f32>> = vec![
            vec![0.0, 1.0, 0.0],
            vec![2.0, 0.0, 0.0],
            vec![-1.0, 0.0, 0.0],
            vec![1.0, 1.0, 0.0],
        ];
        let scores = similarity(&query, &corpus).unwrap();
        assert_eq!(scores.len(), 4);
        assert!(close(scores[0], 0.0));
        assert!(close(scores[1], 1.0));
        assert!(close(scores[2], -1.0));
        assert!(close(scores[3], std::f32::consts::FRAC_1_SQRT_2));
    }

    #[test]
    fn matches_pairwise_cosine() {
        let query = vec![0.3f32, -0.2, 0.9, 0.1];
        let corpus: Vec<Vec<f32>> = vec![vec![0.5, 0.5, 0.1, -0.3], vec![0.0, 0.2, 0.8, 0.4]];
        let scores = similarity(&query, &corpus).unwrap();
        for (score, row) in scores.iter().zip(&corpus) {
            assert!(close(*score, cosine(&query, row)));
        }
    }

    #[test]
    fn symmetric_and_bounded() {
        let a = vec![0.7, 0.1, 0.4];
        let b = vec![0.2, 0.9, 0.3];
        assert!(close(cosine(&a, &b), cosine(&b, &a)));
        assert!(close(cosine(&a, &a), 1.0));
        let s = cosine(&a, &b);
        assert!((-1.0..=1.0).contains(&s));
    }

    #[test]
    fn self_similarity_never_exceeds_one() {
        let a = vec![0.1f32; 512];
        let scores = similarity(&a, &[a.clone()]).unwrap();
        assert!(scores[0] <= 1.0);
        assert!(close(scores[0], 1.0));
    }

    #[test]
    fn zero_vectors_score_zero() {
        let zero = vec![0.0f32, 0.0, 0.0];
        let other = vec![1.0f32, 2.0, 3.0];
        assert_eq!(cosine(&zero, &other), 0.0);
        assert_eq!(cosine(&other, &zero), 0.0);
        assert_eq!(cosine(&zero, &zero), 0.0);

        let scores = similarity(&zero, &[other.clone(), zero.clone()]).unwrap();
        assert_eq!(scores, vec![0.0, 0.0]);
        let scores = similarity(&other, &[zero]).unwrap();
        assert_eq!(scores, vec![0.0]);
        assert!(scores.iter().all(|s| !s.is_nan()));
    }

    #[test]
    fn empty_corpus_is_empty() {
        let corpus: Vec<Vec<f32>> = vec![];
        assert!(similarity(&[1.0, 0.0], &corpus).unwrap().is_empty());
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = similarity(&[1.0, 0.0], &[vec![1.0f32, 0.0], vec![1.0, 0.0, 0.0]]).unwrap_err();
        assert!(matches!(
            err,
            SearchError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }
}
