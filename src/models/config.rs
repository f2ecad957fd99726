//! Configuration model loaded from external sources.

use serde::Deserialize;

use crate::DEFAULT_SIMILARITY_THRESHOLD;

/// Basic configuration shared by the worker and the retrieval API.
///
/// Loaded from an optional `config.yaml` next to the binary, with
/// environment variables (`__` as section separator) taking precedence.
#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_zmq_address")]
    pub zmq_address: String,
    #[serde(default = "default_api_bind")]
    pub api_bind: String,
    /// Minimum cosine similarity for a notice to count as a neighbor.
    /// A deployment tuning knob, never a request parameter.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default)]
    pub youth_policy_api_key: String,
    #[serde(default)]
    pub lh_api_key: String,
    pub embedding: EmbeddingConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingConfig {
    pub api_url: String,
    pub api_key: String,
    #[serde(default = "default_output_dimensionality")]
    pub output_dimensionality: usize,
    /// Per-run provider failure budget before the batcher aborts.
    #[serde(default = "default_max_errors")]
    pub max_errors: usize,
}

fn default_database_url() -> String {
    "app.db".to_string()
}

fn default_zmq_address() -> String {
    "tcp://127.0.0.1:5555".to_string()
}

fn default_api_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_output_dimensionality() -> usize {
    768
}

fn default_max_errors() -> usize {
    10
}

impl ServerConfig {
    pub fn load() -> Result<Self, ::config::ConfigError> {
        ::config::Config::builder()
            .add_source(::config::File::with_name("config").required(false))
            .add_source(::config::Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }
}
