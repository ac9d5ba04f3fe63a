//! Catalog record definitions.

use serde::{Deserialize, Serialize};

/// A hotel and its natural-language annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    /// Catalog-unique id, caller-chosen or taken from the sequence counter.
    pub hotel_id: i64,
    /// Ordered annotation strings.
    pub annotations: Vec<String>,
    /// One vector per annotation, index-aligned. `None` until the hotel is enrolled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<Vec<Vec<f32>>>,
}

impl Hotel {
    pub fn new(hotel_id: i64, annotations: Vec<String>) -> Self {
        Self {
            hotel_id,
            annotations,
            embeddings: None,
        }
    }

    pub fn with_embeddings(mut self, embeddings: Vec<Vec<f32>>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// True when a stored vector exists for every annotation.
    pub fn is_enrolled(&self) -> bool {
        self.embeddings
            .as_ref()
            .is_some_and(|e| e.len() == self.annotations.len())
    }
}
