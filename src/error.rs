//! Error types for the form analysis client

use std::time::Duration;

/// Result type for analysis requests
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Any failure in the analyze request/response cycle.
///
/// Every variant is surfaced to the user the same way, as a single
/// "analysis failed" notification. The variants only exist so logs and
/// messages can say what went wrong.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("Could not reach analysis backend: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Analysis request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Analysis backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed analysis response: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("Analysis rejected by backend: {0}")]
    Rejected(String),

    #[error("Failed to read video file: {0}")]
    Io(#[from] std::io::Error),
}

/// A dropped item failed the media-type check.
///
/// This is a soft rejection: it is returned so callers can observe it, but
/// nothing in the client state changes and nothing is shown to the user.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Rejected '{file_name}': media type '{media_type}' is not a video")]
pub struct InvalidFileRejected {
    pub file_name: String,
    pub media_type: String,
}
