//! Error types for card-assist.
//!
//! Domain-level action failures (user/card/account/transaction lookup,
//! balance preconditions, store write rejection) are *values* carried in
//! [`crate::actions::ActionResult`], not errors — they flow into response
//! metadata and never abort the pipeline. The enums here cover the
//! infrastructure concerns: config, stores, the generation backend, and
//! the HTTP boundary.

/// Top-level error type for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Account/knowledge store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store read failed: {0}")]
    Read(String),

    #[error("Store write rejected: {0}")]
    WriteRejected(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Generation backend errors.
///
/// These never escape the completion gateway — exhausted candidates are
/// absorbed into the deterministic fallback responder.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Model {model} request failed: {reason}")]
    RequestFailed { model: String, reason: String },

    #[error("Invalid response from model {model}: {reason}")]
    InvalidResponse { model: String, reason: String },

    #[error("Model {model} returned empty output")]
    EmptyResponse { model: String },

    #[error("No API credential configured")]
    NotConfigured,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pipeline boundary errors.
///
/// The orchestrator has no fatal path for a well-formed request; these
/// only surface at the HTTP layer for malformed inbound payloads.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Webhook payload missing required field: {0}")]
    WebhookField(String),
}

/// Result type alias for the assistant.
pub type Result<T> = std::result::Result<T, Error>;
