//! Text-to-vector embedding providers.
//!
//! The ranking engine treats the model as an opaque `texts -> vectors` function
//! behind [`EmbeddingProvider`]. Three implementations are available through
//! [`create_provider`]:
//!
//! - `local`: all-MiniLM-L6-v2 under ONNX Runtime (384 dimensions)
//! - `remote`: an HTTP model service that accepts a batch of texts
//! - `hashed`: deterministic feature hashing, no model files required

pub mod hashed;
pub mod local;
pub mod remote;

use anyhow::Result;

/// Trait for embedding text into vectors.
///
/// `embed_batch` must return one vector per input, in input order. The ranking
/// engine verifies that contract and fails the request if it is broken.
/// All methods are synchronous. Callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts with a single model call.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text string.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("provider returned no vector for a single input"))
    }

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;

    /// Identifier stored alongside persisted vectors.
    fn model_name(&self) -> &str;
}

/// Create an embedding provider from config.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => Ok(Box::new(local::LocalEmbeddingProvider::new(config)?)),
        "remote" => Ok(Box::new(remote::RemoteEmbeddingProvider::new(config)?)),
        "hashed" => Ok(Box::new(hashed::HashedEmbeddingProvider::new(
            config.dimensions,
        ))),
        other => anyhow::bail!(
            "unknown embedding provider: {other}. Supported: local, remote, hashed"
        ),
    }
}

/// Identifier persisted with stored vectors: provider kind, model, and width.
///
/// Two providers whose vectors are not interchangeable never share an identifier.
pub fn model_id(kind: &str, model: &str, dimensions: usize) -> String {
    format!("{kind}:{model}:{dimensions}")
}

/// The identifier the configured provider will report, without constructing it.
pub fn configured_model_id(config: &crate::config::EmbeddingConfig) -> String {
    match config.provider.as_str() {
        "local" => model_id("local", &config.model, local::MINILM_DIM),
        "hashed" => model_id("hashed", hashed::HASH_FUNCTION, config.dimensions.max(1)),
        kind => model_id(kind, &config.model, config.dimensions),
    }
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
pub(crate) fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;

    #[test]
    fn test_l2_normalize() {
        let normalized = l2_normalize(&[3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        assert_eq!(l2_normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn create_hashed_provider() {
        let config = EmbeddingConfig {
            provider: "hashed".into(),
            dimensions: 32,
            ..EmbeddingConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.dimensions(), 32);
        assert_eq!(provider.embed("ocean view").unwrap().len(), 32);
        assert_eq!(provider.model_name(), configured_model_id(&config));
    }

    #[test]
    fn model_ids_separate_providers_and_widths() {
        let local = EmbeddingConfig::default();
        let remote = EmbeddingConfig {
            provider: "remote".into(),
            ..EmbeddingConfig::default()
        };
        assert_eq!(configured_model_id(&local), "local:all-MiniLM-L6-v2:384");
        assert_eq!(configured_model_id(&remote), "remote:all-MiniLM-L6-v2:512");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = EmbeddingConfig {
            provider: "tfjs".into(),
            ..EmbeddingConfig::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("unknown embedding provider"));
    }
}
