//! Error types for the engine.

use thiserror::Error;

/// Errors returned by coordinator operations.
///
/// None of these are fatal: every one leaves state unchanged and can be
/// retried by repeating the originating action.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No platform with that id.
    #[error("Unknown platform: {0}")]
    NotFound(String),

    /// The request would break `active => connected` or targets the wrong
    /// connection state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A linking handshake is already in flight.
    #[error("Connection flow already in progress for {0}")]
    Conflict(String),

    /// Going live needs at least one connected and active destination.
    #[error("Please connect and activate at least one platform first")]
    NoActiveDestination,

    /// Mood analysis needs more chat.
    #[error("Not enough chat messages: have {have}, need {need}")]
    InsufficientData { have: usize, need: usize },

    /// Persistence failed.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Login rejected.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Registration for an email that already has an account.
    #[error("An account already exists for {0}")]
    AlreadyExists(String),

    /// The async runtime could not be created.
    #[error("Runtime error: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Errors from the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value is not valid JSON for the expected type.
    #[error("Corrupt record {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be encoded.
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Errors from the advisory service.
#[derive(Debug, Error)]
pub enum AdvisoryError {
    /// No API key configured.
    #[error("Advisory service is not configured")]
    Disabled,

    /// Request failed in transport.
    #[error("Advisory service unavailable: {0}")]
    Unavailable(String),

    /// Response could not be understood.
    #[error("Advisory response invalid: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for AdvisoryError {
    fn from(e: reqwest::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}
