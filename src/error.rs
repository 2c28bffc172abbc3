//! Top-level error types for Maestro.

use std::sync::Arc;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("discord error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingKey(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to create data directory {path}: {source}")]
    DataDir {
        path: String,
        source: Arc<std::io::Error>,
    },
}

/// JSON store load/save errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: Arc<std::io::Error>,
    },

    #[error("failed to serialize store contents: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// LLM provider errors. Each adapter failure mode is a distinct kind so the
/// fallback decision in the gateway is explicit rather than catch-all.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider rate limited: {0}")]
    RateLimited(String),

    #[error("provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("missing API key for provider: {0}")]
    MissingProviderKey(String),
}

/// Action-plan parse and execution errors.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("no fenced JSON block in response")]
    NoJsonBlock,

    #[error("action plan is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("guild operation failed: {0}")]
    GuildOp(String),
}
