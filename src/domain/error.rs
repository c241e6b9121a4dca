// Error taxonomy shared by the ingest and projection layers
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TelemetryError {
    /// Key is not part of the configured key set
    #[error("unknown key: {key}")]
    UnknownKey { key: String },

    /// Transient source failure; the key is skipped for the round
    #[error("sample unavailable for {key}: {cause}")]
    SampleUnavailable { key: String, cause: String },

    /// Persisted snapshot could not be parsed
    #[error("corrupt snapshot: {reason}")]
    CorruptSnapshot { reason: String },

    /// Nothing has been published yet
    #[error("snapshot not initialized")]
    NotInitialized,

    /// Selected key has zero rows in the current snapshot
    #[error("no data for key: {key}")]
    NoDataForKey { key: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl TelemetryError {
    pub fn unknown_key(key: &str) -> Self {
        Self::UnknownKey {
            key: key.to_string(),
        }
    }

    pub fn no_data(key: &str) -> Self {
        Self::NoDataForKey {
            key: key.to_string(),
        }
    }

    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptSnapshot {
            reason: reason.into(),
        }
    }

    /// Errors that must stop the ingest loop rather than skip a key
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Encode(_) | Self::Config(_))
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
