use thiserror::Error;

/// Application-level error type.
/// Every transport/HTTP failure is mapped into one of these variants by the
/// API client; the workflow layer never inspects raw `reqwest` errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Failed to create session: {0}")]
    SessionCreate(String),

    #[error("Failed to fetch session: {0}")]
    SessionFetch(String),

    #[error("Session not found or expired")]
    SessionNotFound,

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("{0}")]
    Validation(String),

    #[error("Backend is unreachable")]
    BackendUnreachable,
}

/// Where in the workflow an error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    Startup,
    Upload,
    Submission,
}

/// The error record held by the state container: a human-readable message
/// tagged with the phase that produced it. Last write wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowError {
    pub message: String,
    pub phase: ErrorPhase,
}

impl WorkflowError {
    pub fn new(error: &AppError, phase: ErrorPhase) -> Self {
        Self {
            message: error.to_string(),
            phase,
        }
    }
}
