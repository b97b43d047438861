use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Cloneable so a single in-flight computation can hand its outcome to every
/// caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocusError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No destinations to evaluate")]
    NoDestinations,

    #[error("Every provider failed: {0}")]
    ProviderExhausted(String),

    #[error("Corrupted cache entry: {0}")]
    CacheCorruption(String),

    #[error("Upstream call failed: {0}")]
    UpstreamTransient(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Cache store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LocusError {
    fn from(error: serde_json::Error) -> Self {
        LocusError::Serialization(error.to_string())
    }
}
