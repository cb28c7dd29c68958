//! Error taxonomy shared by every pipeline stage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScreenerError>;

#[derive(Debug, Error)]
pub enum ScreenerError {
    /// Missing or insufficient series. Filters the instrument, never the batch.
    #[error("data unavailable for {code}: {reason}")]
    DataUnavailable { code: String, reason: String },

    #[error("trade signal {id} not found")]
    NotFound { id: i64 },

    /// Retryable fetch failure (timeouts, dropped connections).
    #[error("transient fetch failure for {code}: {reason}")]
    TransientFetchFailure { code: String, reason: String },

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("cache failure: {0}")]
    Cache(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ScreenerError {
    pub fn data_unavailable(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            code: code.into(),
            reason: reason.into(),
        }
    }

    pub fn transient(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransientFetchFailure {
            code: code.into(),
            reason: reason.into(),
        }
    }

    /// Whether the retry policy should attempt the operation again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFetchFailure { .. })
    }
}

impl From<tokio_postgres::Error> for ScreenerError {
    fn from(e: tokio_postgres::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<redis::RedisError> for ScreenerError {
    fn from(e: redis::RedisError) -> Self {
        Self::Cache(e.to_string())
    }
}

impl From<serde_json::Error> for ScreenerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Cache(format!("serialization: {}", e))
    }
}
