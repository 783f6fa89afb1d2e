//! Unified error types for vcard

use thiserror::Error;

/// Unified error type for all vcard operations
///
/// Lint findings are never errors; they accumulate in `Draft::validation`.
/// Errors are reserved for protocol parsing, path resolution and I/O.
#[derive(Error, Debug)]
pub enum DraftError {
    // Board transcript errors
    #[error("no draft board found in transcript")]
    BoardUninitialized,

    #[error("draft board start marker has no matching end marker")]
    BoardUnterminated,

    #[error("draft board has no fenced JSON block")]
    BoardMissingFence,

    #[error("draft board JSON is invalid: {message}")]
    BoardInvalidJson { message: String, raw_json: String },

    // Read protocol errors
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Index {index} out of range for {path} (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Unknown key '{key}' under {path} (known: {known})")]
    UnknownSubKey {
        path: String,
        key: String,
        known: String,
    },

    #[error("Value at {path} is {size} chars, over the limit of {limit}; read a narrower path such as {hint}")]
    ValueTooLarge {
        path: String,
        size: usize,
        limit: usize,
        hint: String,
    },

    #[error("Invalid read request: {0}")]
    ReadRequest(String),

    // Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl DraftError {
    /// Raw payload text attached to a board parse failure, if any
    pub fn raw_json(&self) -> Option<&str> {
        match self {
            Self::BoardInvalidJson { raw_json, .. } => Some(raw_json),
            _ => None,
        }
    }

    /// True when a transcript simply has no board yet
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Self::BoardUninitialized)
    }
}

/// Result type alias using DraftError
pub type Result<T> = std::result::Result<T, DraftError>;
