//! Ranking and comparison routes.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use super::AppState;
use crate::catalog::SearchOutcome;
use crate::error::{Result, SearchError};
use crate::ranking::aggregate::AggregatedResult;
use crate::ranking::CorpusSource;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryRequest {
    user_query: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompareRequest {
    user_query: String,
    #[serde(alias = "candidateTexts")]
    hotel_annotations: Vec<String>,
}

/// Ranked hotels plus stage timings in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResponse {
    pub execution_time: f64,
    /// The single embedding call. It covers the query plus every corpus text
    /// embedded for this request: the whole catalog on `/search`, only
    /// un-enrolled hotels on `/searchEmbeddings`.
    pub user_embedding_time: f64,
    /// Reading the catalog snapshot from storage.
    pub embedding_query_time: f64,
    pub similarity_compute_time: f64,
    pub sort_time: f64,
    pub results: Vec<AggregatedResult>,
}

impl From<SearchOutcome> for RankedResponse {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            execution_time: outcome.total.as_secs_f64(),
            user_embedding_time: outcome.timings.embedding.as_secs_f64(),
            embedding_query_time: outcome.snapshot.as_secs_f64(),
            similarity_compute_time: outcome.timings.similarity.as_secs_f64(),
            sort_time: outcome.timings.sort.as_secs_f64(),
            results: outcome.results,
        }
    }
}

fn require_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(SearchError::InvalidRequest("userQuery must not be empty".into()));
    }
    Ok(())
}

async fn ranked(
    state: AppState,
    query: String,
    source: CorpusSource,
) -> Result<Json<RankedResponse>> {
    let span = tracing::info_span!("search", request_id = %Uuid::now_v7(), ?source);
    async move {
        require_query(&query)?;
        let outcome = state.catalog.search(&query, source).await?;
        let response = RankedResponse::from(outcome);
        tracing::debug!(
            results = response.results.len(),
            execution_time = response.execution_time,
            similarity_compute_time = response.similarity_compute_time,
            sort_time = response.sort_time,
            "search served"
        );
        Ok(Json(response))
    }
    .instrument(span)
    .await
}

/// POST /search: re-embed the whole catalog alongside the query.
pub(crate) async fn search(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<RankedResponse>> {
    ranked(state, request.user_query, CorpusSource::Fresh).await
}

/// POST /searchEmbeddings: rank against stored vectors.
pub(crate) async fn search_embeddings(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<RankedResponse>> {
    ranked(state, request.user_query, CorpusSource::Stored).await
}

/// POST /compare: similarity of the query to each supplied text, in order.
pub(crate) async fn compare(
    State(state): State<AppState>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<Vec<f32>>> {
    let span = tracing::info_span!("compare", request_id = %Uuid::now_v7());
    async move {
        require_query(&request.user_query)?;
        let scores = state
            .catalog
            .compare(&request.user_query, request.hotel_annotations)
            .await?;
        Ok(Json(scores))
    }
    .instrument(span)
    .await
}
