//! Error types for the assistant pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Fatal errors that terminate a request.
///
/// Soft failures (individual fetches, speech conversion, model-output
/// parsing) never surface here; they are logged and replaced with empty
/// values at the orchestrator boundary.
#[derive(Error, Debug)]
pub enum AssistantError {

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Language model error: {0}")]
    ModelError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure of a single data-source call.
///
/// Fetchers never raise past their boundary: the orchestrator converts
/// any `FetchError` into an empty mapping plus one log entry.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status} for {path}")]
    Status {
        status: reqwest::StatusCode,
        path: String,
    },

    #[error("malformed provider payload: {0}")]
    Payload(String),
}
