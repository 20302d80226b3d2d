use domtrace_protocol::InvalidRecordingId;
use domtrace_protocol::InvalidTimestamp;
use domtrace_protocol::UnknownEventType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecorderError>;

#[derive(Error, Debug)]
pub enum RecorderError {
    /// Malformed caller input: a bad session id, URL or selector pattern.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The browser collaborator failed to launch, attach or navigate.
    #[error("browser error: {0}")]
    Browser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<InvalidRecordingId> for RecorderError {
    fn from(e: InvalidRecordingId) -> Self {
        RecorderError::Validation(e.to_string())
    }
}

impl From<InvalidTimestamp> for RecorderError {
    fn from(e: InvalidTimestamp) -> Self {
        RecorderError::Validation(e.to_string())
    }
}

impl From<UnknownEventType> for RecorderError {
    fn from(e: UnknownEventType) -> Self {
        RecorderError::Validation(e.to_string())
    }
}

impl RecorderError {
    pub fn browser(err: impl std::fmt::Display) -> Self {
        RecorderError::Browser(err.to_string())
    }
}
