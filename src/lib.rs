//! Semantic search over a catalog of hotels described by natural-language annotations.
//!
//! A free-text query is embedded, compared by cosine similarity against every
//! annotation vector, reduced to a per-hotel mean and max, and ranked by max
//! similarity (ties keep catalog order).
//!
//! # Architecture
//!
//! - **Storage**: SQLite, one row per annotation with its vector as `f32` bytes
//! - **Embeddings**: local ONNX Runtime all-MiniLM-L6-v2, a remote model
//!   service, or deterministic feature hashing
//! - **Ids**: an atomic increment-and-fetch counter in the store
//! - **Transport**: JSON over HTTP (axum)
//!
//! # Modules
//!
//! - [`config`]: configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`embedding`]: the [`embedding::EmbeddingProvider`] trait and its implementations
//! - [`ranking`]: similarity, batch embedding, aggregation, and the ranking pipeline
//! - [`catalog`]: the annotation store, id allocator, and write paths
//! - [`routes`]: the HTTP API

pub mod catalog;
pub mod config;
pub mod db;
pub mod deadline;
pub mod embedding;
pub mod error;
pub mod ranking;
pub mod routes;
pub mod server;

pub use error::{Result, SearchError};
