// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the recognition library.

use std::fmt;

/// Result type alias for recognition operations.
pub type Result<T> = std::result::Result<T, RecognitionError>;

/// Main error type for the recognition library.
#[derive(Debug)]
pub enum RecognitionError {
    /// Missing or corrupt weight artifact or label file. Fatal at startup.
    ConfigError(String),
    /// Wrong-length landmark or feature input, or a call the session state forbids.
    InvalidInput(String),
    /// Label lookup on an abstaining or out-of-range class.
    LookupError(String),
    /// Malformed landmark recording.
    SourceError(String),
    /// Error raised by an external inference backend.
    InferenceError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
}

impl RecognitionError {
    /// Whether this error must abort startup.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Self::LookupError(msg) => write!(f, "Lookup error: {msg}"),
            Self::SourceError(msg) => write!(f, "Source error: {msg}"),
            Self::InferenceError(msg) => write!(f, "Inference error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for RecognitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RecognitionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for RecognitionError {
    fn from(err: serde_json::Error) -> Self {
        Self::SourceError(err.to_string())
    }
}
