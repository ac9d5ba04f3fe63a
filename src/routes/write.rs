//! Catalog mutation routes.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::{Annotations, AppState};
use crate::error::{Result, SearchError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InsertRequest {
    hotel_id: Option<i64>,
    new_annotations: Annotations,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateRequest {
    hotel_id: i64,
    new_annotations: Annotations,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteRequest {
    hotel_id: Option<i64>,
    #[serde(default)]
    delete_all: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PopulateRequest {
    num_annotations: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WriteResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hotel_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inserted: Option<usize>,
}

impl WriteResponse {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hotel_id: None,
            deleted_count: None,
            modified_count: None,
            inserted: None,
        }
    }
}

/// POST /insert
pub(crate) async fn insert(
    State(state): State<AppState>,
    Json(request): Json<InsertRequest>,
) -> Result<Json<WriteResponse>> {
    let outcome = state
        .catalog
        .insert(request.hotel_id, request.new_annotations.into_vec())
        .await?;
    let message = if outcome.appended {
        format!("Added annotations to hotel {}.", outcome.hotel_id)
    } else {
        format!("Inserted hotel {}.", outcome.hotel_id)
    };
    Ok(Json(WriteResponse {
        hotel_id: Some(outcome.hotel_id),
        ..WriteResponse::message(message)
    }))
}

/// POST /update
pub(crate) async fn update(
    State(state): State<AppState>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<WriteResponse>> {
    state
        .catalog
        .update(request.hotel_id, request.new_annotations.into_vec())
        .await?;
    Ok(Json(WriteResponse {
        hotel_id: Some(request.hotel_id),
        modified_count: Some(1),
        ..WriteResponse::message("Updated 1 document.")
    }))
}

/// POST /delete: one hotel by id, or the whole catalog with `deleteAll`.
pub(crate) async fn delete(
    State(state): State<AppState>,
    Json(request): Json<DeleteRequest>,
) -> Result<Json<WriteResponse>> {
    if request.delete_all {
        let deleted = state.catalog.delete_all().await?;
        return Ok(Json(WriteResponse {
            deleted_count: Some(deleted),
            ..WriteResponse::message("Deleted all documents and reset counter.")
        }));
    }

    let hotel_id = request.hotel_id.ok_or_else(|| {
        SearchError::InvalidRequest("hotelId is required unless deleteAll is set".into())
    })?;
    let deleted = state.catalog.delete(hotel_id).await?;
    Ok(Json(WriteResponse {
        deleted_count: Some(deleted),
        ..WriteResponse::message(format!("Deleted {deleted} document."))
    }))
}

/// POST /enrol: recompute and store vectors for every hotel.
pub(crate) async fn enrol(State(state): State<AppState>) -> Result<Json<WriteResponse>> {
    let modified = state.catalog.enrol().await?;
    Ok(Json(WriteResponse {
        modified_count: Some(modified),
        ..WriteResponse::message("Embeddings calculated and saved successfully.")
    }))
}

/// POST /populate: insert synthetic hotels. The body is optional.
pub(crate) async fn populate(
    State(state): State<AppState>,
    request: Option<Json<PopulateRequest>>,
) -> Result<Json<WriteResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let outcome = state
        .catalog
        .populate(request.num_annotations, request.seed)
        .await?;
    Ok(Json(WriteResponse {
        inserted: Some(outcome.inserted),
        ..WriteResponse::message(format!(
            "Inserted {} documents in {} seconds",
            outcome.inserted,
            outcome.elapsed.as_secs_f64()
        ))
    }))
}
