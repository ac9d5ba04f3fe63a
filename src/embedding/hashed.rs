//! Deterministic feature-hashing provider.
//!
//! Each lowercase word token is hashed (FNV-1a) into a bucket with a sign bit, and
//! the resulting count vector is L2-normalized. Texts that share words get a
//! positive cosine similarity. Useful for offline runs and tests; it has no
//! notion of synonyms.

use anyhow::Result;

use super::{l2_normalize, model_id, EmbeddingProvider};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub const HASH_FUNCTION: &str = "fnv1a";

pub struct HashedEmbeddingProvider {
    dimensions: usize,
    model: String,
}

impl HashedEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model: model_id("hashed", HASH_FUNCTION, dimensions),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(&token.to_lowercase());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        l2_normalize(&v)
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes()
        .fold(FNV_OFFSET, |acc, b| (acc ^ b as u64).wrapping_mul(FNV_PRIME))
}

impl EmbeddingProvider for HashedEmbeddingProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::similarity::cosine;

    #[test]
    fn same_text_same_vector() {
        let provider = HashedEmbeddingProvider::new(128);
        let a = provider.embed("Cozy hotel with parking").unwrap();
        let b = provider.embed("cozy HOTEL with parking!").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn shared_words_raise_similarity() {
        let provider = HashedEmbeddingProvider::new(512);
        let query = provider.embed("spa and ocean view").unwrap();
        let beach = provider
            .embed("Beachfront hotel with spa, gym, and ocean view.")
            .unwrap();
        let lodge = provider
            .embed("Mountain lodge with fireplace and hiking trails.")
            .unwrap();
        assert!(cosine(&query, &beach) > cosine(&query, &lodge));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let provider = HashedEmbeddingProvider::new(16);
        let v = provider.embed("  ,. ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn width_is_part_of_the_model_name() {
        assert_eq!(HashedEmbeddingProvider::new(512).model_name(), "hashed:fnv1a:512");
        assert_ne!(
            HashedEmbeddingProvider::new(512).model_name(),
            HashedEmbeddingProvider::new(256).model_name()
        );
    }

    #[test]
    fn batch_preserves_order_and_length() {
        let provider = HashedEmbeddingProvider::new(64);
        let batch = provider.embed_batch(&["gym", "spa", "gym"]).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0], batch[2]);
        assert_eq!(batch[0].len(), 64);
    }
}
