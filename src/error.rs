use crate::app::ports::QueryState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Object storage error at {uri}: {message}")]
    Storage { uri: String, message: String },

    #[error("Query {handle} finished with state {state}")]
    QueryFailed { handle: String, state: QueryState },

    #[error("Query {handle} did not reach a terminal state after {attempts} poll attempts")]
    PollTimeout { handle: String, attempts: u32 },

    #[error("Query service error: {0}")]
    Query(String),

    #[error("Malformed object location: {0}")]
    BadLocation(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
