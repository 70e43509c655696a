use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A server-issued session correlating an uploaded résumé with subsequent
/// analysis requests. The id is opaque and immutable for its lifetime;
/// `expires_at` is set by the backend, never computed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub has_resume: bool,
}

/// Descriptor of an uploaded résumé, as parsed by the backend.
/// Presence of this record implies the backend holds extracted text for the
/// current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeInfo {
    pub session_id: String,
    pub file_name: String,
    pub file_type: String,
    pub text_chars: u64,
}

impl ResumeInfo {
    /// Stand-in descriptor for a session that already holds a résumé on the
    /// backend (e.g. after a page reload) without a local upload record.
    pub fn placeholder(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            file_name: "previously uploaded".to_string(),
            file_type: "unknown".to_string(),
            text_chars: 0,
        }
    }
}
