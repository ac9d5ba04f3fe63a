//! Catalog write paths.
//!
//! Vectors are computed when annotations are written: every path embeds its
//! texts in one batched provider call before touching the store, so a
//! provider failure leaves the catalog unchanged. `enrol` recomputes every
//! stored vector, for backfilling legacy rows or after a model change.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::seed;
use super::store::AnnotationStore;
use super::types::Hotel;
use super::Catalog;
use crate::error::{Result, SearchError};
use crate::ranking::batch;

/// Upper bound on hotels generated by one `populate` call.
pub const MAX_POPULATE: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub hotel_id: i64,
    /// True when the annotations were added to an existing hotel.
    pub appended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulateOutcome {
    pub inserted: usize,
    pub elapsed: Duration,
}

fn validate_annotations(annotations: &[String]) -> Result<()> {
    if annotations.is_empty() {
        return Err(SearchError::InvalidRequest(
            "at least one annotation is required".into(),
        ));
    }
    if let Some(i) = annotations.iter().position(|a| a.trim().is_empty()) {
        return Err(SearchError::InvalidRequest(format!(
            "annotation {i} is blank"
        )));
    }
    Ok(())
}

fn validate_id(hotel_id: i64) -> Result<()> {
    if hotel_id <= 0 {
        return Err(SearchError::InvalidRequest(format!(
            "hotel id must be positive, got {hotel_id}"
        )));
    }
    Ok(())
}

/// Refuse to mix vectors from different models in one catalog.
///
/// The first write records the provider's model; an empty catalog adopts whatever
/// model writes to it next.
fn ensure_model(store: &dyn AnnotationStore, model: &str) -> Result<()> {
    match store.embedding_model()? {
        Some(stored) if stored == model => Ok(()),
        Some(stored) if store.count()? > 0 => Err(SearchError::ModelMismatch {
            stored,
            configured: model.to_string(),
        }),
        _ => store.set_embedding_model(model),
    }
}

impl Catalog {
    async fn embed(&self, annotations: &[String]) -> Result<Vec<Vec<f32>>> {
        batch::embed_texts(
            Arc::clone(&self.provider),
            annotations.to_vec(),
            self.embedding_timeout,
        )
        .await
    }

    /// Add annotations to a hotel.
    ///
    /// With an id that exists, the annotations are appended after the current
    /// ones. With an id that does not exist, a hotel is created under it.
    /// Without an id, one is allocated from the sequence counter.
    ///
    /// A [`SearchError::StorageTimeout`] does not roll the write back: the detached
    /// store call may still commit, including an allocated id the caller never sees.
    pub async fn insert(
        &self,
        hotel_id: Option<i64>,
        annotations: Vec<String>,
    ) -> Result<InsertOutcome> {
        validate_annotations(&annotations)?;
        if let Some(id) = hotel_id {
            validate_id(id)?;
        }

        let embeddings = self.embed(&annotations).await?;
        let ids = Arc::clone(&self.ids);
        let model = self.provider.model_name().to_string();

        let outcome = self
            .with_store(move |store| {
                ensure_model(store, &model)?;
                let outcome = match hotel_id {
                    Some(id) if store.append_annotations(id, &annotations, &embeddings)? => {
                        InsertOutcome {
                            hotel_id: id,
                            appended: true,
                        }
                    }
                    Some(id) => {
                        store.insert(&Hotel::new(id, annotations).with_embeddings(embeddings))?;
                        InsertOutcome {
                            hotel_id: id,
                            appended: false,
                        }
                    }
                    None => {
                        let id = ids.next_id()?;
                        store.insert(&Hotel::new(id, annotations).with_embeddings(embeddings))?;
                        InsertOutcome {
                            hotel_id: id,
                            appended: false,
                        }
                    }
                };
                Ok(outcome)
            })
            .await?;

        tracing::info!(
            hotel_id = outcome.hotel_id,
            appended = outcome.appended,
            "annotations written"
        );
        Ok(outcome)
    }

    /// Replace a hotel's annotations. Fails with [`SearchError::HotelNotFound`] if absent.
    pub async fn update(&self, hotel_id: i64, annotations: Vec<String>) -> Result<()> {
        validate_annotations(&annotations)?;
        let embeddings = self.embed(&annotations).await?;
        let model = self.provider.model_name().to_string();
        let count = annotations.len();

        self.with_store(move |store| {
            ensure_model(store, &model)?;
            if !store.update_annotations(hotel_id, &annotations, &embeddings)? {
                return Err(SearchError::HotelNotFound(hotel_id));
            }
            Ok(())
        })
        .await?;

        tracing::info!(hotel_id, annotations = count, "annotations replaced");
        Ok(())
    }

    /// Delete one hotel. Returns the number of hotels removed (0 or 1).
    pub async fn delete(&self, hotel_id: i64) -> Result<usize> {
        let deleted = self
            .with_store(move |store| store.delete_by_id(hotel_id))
            .await?;
        tracing::info!(hotel_id, deleted, "hotel deleted");
        Ok(deleted)
    }

    /// Delete every hotel and reset the id counter, so the next allocated id is 1.
    pub async fn delete_all(&self) -> Result<usize> {
        let ids = Arc::clone(&self.ids);
        let deleted = self
            .with_store(move |store| {
                let deleted = store.delete_all()?;
                ids.reset()?;
                Ok(deleted)
            })
            .await?;
        tracing::info!(deleted, "catalog cleared");
        Ok(deleted)
    }

    /// Recompute and persist vectors for every hotel with one batched embedding call.
    ///
    /// Returns the number of hotels whose vectors were written.
    pub async fn enrol(&self) -> Result<usize> {
        let hotels: Vec<Hotel> = self
            .snapshot()
            .await?
            .into_iter()
            .filter(|h| !h.annotations.is_empty())
            .collect();
        if hotels.is_empty() {
            return Ok(0);
        }

        let grouped: Vec<Vec<String>> = hotels.iter().map(|h| h.annotations.clone()).collect();
        let vectors = batch::embed_grouped(
            Arc::clone(&self.provider),
            &grouped,
            self.embedding_timeout,
        )
        .await?;

        let updates: Vec<(i64, Vec<Vec<f32>>)> =
            hotels.iter().map(|h| h.hotel_id).zip(vectors).collect();
        let model = self.provider.model_name().to_string();
        let modified = self
            .with_store(move |store| {
                let modified = store.bulk_update_embeddings(&updates)?;
                store.set_embedding_model(&model)?;
                Ok(modified)
            })
            .await?;

        tracing::info!(modified, model = self.provider.model_name(), "catalog enrolled");
        Ok(modified)
    }

    /// Generate and insert `count` synthetic hotels (the configured default when `None`).
    ///
    /// All annotations are embedded before any id is allocated.
    pub async fn populate(
        &self,
        count: Option<usize>,
        seed: Option<u64>,
    ) -> Result<PopulateOutcome> {
        let start = Instant::now();
        let count = count.unwrap_or(self.default_populate_count);
        if count > MAX_POPULATE {
            return Err(SearchError::InvalidRequest(format!(
                "cannot populate more than {MAX_POPULATE} hotels at once"
            )));
        }
        if self.annotations_per_hotel == 0 {
            return Err(SearchError::InvalidRequest(
                "populate.annotations_per_hotel must be at least 1".into(),
            ));
        }
        if count == 0 {
            return Ok(PopulateOutcome {
                inserted: 0,
                elapsed: start.elapsed(),
            });
        }

        let grouped = seed::generate(count, self.annotations_per_hotel, seed);
        let vectors = batch::embed_grouped(
            Arc::clone(&self.provider),
            &grouped,
            self.embedding_timeout,
        )
        .await?;

        let ids = Arc::clone(&self.ids);
        let model = self.provider.model_name().to_string();
        let inserted = self
            .with_store(move |store| {
                ensure_model(store, &model)?;
                let hotels = grouped
                    .into_iter()
                    .zip(vectors)
                    .map(|(annotations, embeddings)| {
                        Ok(Hotel::new(ids.next_id()?, annotations).with_embeddings(embeddings))
                    })
                    .collect::<Result<Vec<_>>>()?;
                store.insert_many(&hotels)
            })
            .await?;

        let elapsed = start.elapsed();
        tracing::info!(
            inserted,
            elapsed_ms = elapsed.as_millis() as u64,
            "catalog populated"
        );
        Ok(PopulateOutcome { inserted, elapsed })
    }
}
