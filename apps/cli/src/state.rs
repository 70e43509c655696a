//! Workflow state container — the single authoritative record of the user
//! journey. Mutation happens only through the named operations below; each
//! mutator that touches the session id or access key also writes through to
//! the durable store so the values survive a restart.

use crate::errors::WorkflowError;
use crate::models::analysis::GapReport;
use crate::models::session::ResumeInfo;
use crate::storage::{LocalStore, API_KEY_KEY, SESSION_KEY};

#[derive(Debug)]
pub struct AppState {
    store: LocalStore,
    session_id: Option<String>,
    api_key: Option<String>,
    resume: Option<ResumeInfo>,
    jd_text: String,
    target_role: String,
    result: Option<GapReport>,
    error: Option<WorkflowError>,
    /// `None` until the first health probe completes.
    backend_online: Option<bool>,
}

impl AppState {
    /// Builds the container, reconstructing the session id and access key
    /// from the durable store.
    pub fn new(store: LocalStore) -> Self {
        let session_id = store.get(SESSION_KEY);
        let api_key = store.get(API_KEY_KEY);
        Self {
            store,
            session_id,
            api_key,
            resume: None,
            jd_text: String::new(),
            target_role: String::new(),
            result: None,
            error: None,
            backend_online: None,
        }
    }

    // ── Mutators ────────────────────────────────────────────────────────

    pub fn set_session(&mut self, session_id: String) {
        self.store.set(SESSION_KEY, &session_id);
        self.session_id = Some(session_id);
    }

    pub fn set_api_key(&mut self, key: Option<String>) {
        match &key {
            Some(k) => self.store.set(API_KEY_KEY, k),
            None => self.store.remove(API_KEY_KEY),
        }
        self.api_key = key;
    }

    pub fn set_resume(&mut self, resume: Option<ResumeInfo>) {
        self.resume = resume;
    }

    pub fn set_job_description(&mut self, jd_text: String, target_role: String) {
        self.jd_text = jd_text;
        self.target_role = target_role;
    }

    pub fn set_result(&mut self, result: GapReport) {
        self.result = Some(result);
    }

    pub fn set_error(&mut self, error: Option<WorkflowError>) {
        self.error = error;
    }

    pub fn set_backend_online(&mut self, online: bool) {
        self.backend_online = Some(online);
    }

    /// Full teardown: clears every field except the last known backend
    /// reachability flag and removes both durable keys.
    pub fn reset_all(&mut self) {
        self.store.remove(SESSION_KEY);
        self.store.remove(API_KEY_KEY);
        self.session_id = None;
        self.api_key = None;
        self.resume = None;
        self.jd_text.clear();
        self.target_role.clear();
        self.result = None;
        self.error = None;
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Masked form of the access key for display and logs: `...{last4}`.
    /// The only sanctioned way to show the key.
    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key.as_deref().map(mask_key)
    }

    pub fn resume(&self) -> Option<&ResumeInfo> {
        self.resume.as_ref()
    }

    pub fn jd_text(&self) -> &str {
        &self.jd_text
    }

    pub fn target_role(&self) -> &str {
        &self.target_role
    }

    pub fn result(&self) -> Option<&GapReport> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        self.error.as_ref()
    }

    pub fn backend_online(&self) -> Option<bool> {
        self.backend_online
    }
}

fn mask_key(key: &str) -> String {
    let tail: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{tail}")
}
