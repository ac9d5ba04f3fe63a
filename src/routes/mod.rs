//! HTTP surface.
//!
//! JSON in and out, with the camelCase field names existing clients send.
//! Every handler delegates to [`Catalog`]; a [`SearchError`] becomes a status
//! code plus `{"error": "<message>"}`.

mod search;
mod write;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::catalog::Catalog;
use crate::error::SearchError;

pub use search::RankedResponse;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
}

impl AppState {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health-check", get(health_check))
        .route("/", get(landing))
        .route("/compare", post(search::compare))
        .route("/search", post(search::search))
        .route("/searchEmbeddings", post(search::search_embeddings))
        .route("/insert", post(write::insert))
        .route("/update", post(write::update))
        .route("/delete", post(write::delete))
        .route("/enrol", post(write::enrol))
        .route("/populate", post(write::populate))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn landing() -> Html<&'static str> {
    Html(
        "<!DOCTYPE html>\n<html>\n  <head>\n    <title>Hotel Search</title>\n  </head>\n  <body>\n    \
         <p>This is a hotel search service.</p>\n  </body>\n</html>\n",
    )
}

/// One annotation or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Annotations {
    One(String),
    Many(Vec<String>),
}

impl Annotations {
    fn into_vec(self) -> Vec<String> {
        match self {
            Annotations::One(text) => vec![text],
            Annotations::Many(texts) => texts,
        }
    }
}

impl SearchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SearchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SearchError::HotelNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, timeout = self.is_timeout(), "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            SearchError::InvalidRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(SearchError::HotelNotFound(3).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            SearchError::BatchSizeMismatch { expected: 2, actual: 1 }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            SearchError::EmbeddingTimeout { after_ms: 10 }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let mismatch = SearchError::ModelMismatch {
            stored: "hashed:fnv1a:512".into(),
            configured: "hashed:fnv1a:256".into(),
        };
        assert_eq!(mismatch.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn annotations_accept_string_or_list() {
        let one: Annotations = serde_json::from_str(r#""Cozy hotel""#).unwrap();
        assert_eq!(one.into_vec(), vec!["Cozy hotel"]);
        let many: Annotations = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(many.into_vec(), vec!["a", "b"]);
    }
}
