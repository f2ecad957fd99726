pub mod db;
pub mod domain;
pub mod models;
pub mod processing;
pub mod repository;
pub mod retrieval;
pub mod schema;
pub mod sources;

/// Default minimum cosine similarity for policy-to-notice matching.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.83;
