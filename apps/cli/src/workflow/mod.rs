//! Workflow state machine — sequences the user journey from initialization
//! through upload, submission, and result display.
//!
//! `Initializing → Offline | Ready`; `Ready → Submitting → Succeeded` or back
//! to `Ready` carrying an error. `Ready` is refined by two derived gates
//! rather than nested states: `has_resume` and `can_submit`.
//!
//! All remote traffic goes through the injected `Arc<dyn GapApi>`; all state
//! lives in the owned `AppState` and is touched only via its named mutators.

use std::sync::Arc;

use tracing::{debug, info};

use crate::api_client::{resume_mime, GapApi, ProgressFn};
use crate::errors::{AppError, ErrorPhase, WorkflowError};
use crate::models::analysis::GapRequest;
use crate::models::session::ResumeInfo;
use crate::state::AppState;

/// Minimum job-description length accepted for submission.
pub const MIN_JD_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Offline,
    Ready,
    Submitting,
    Succeeded,
}

pub struct Workflow {
    api: Arc<dyn GapApi>,
    state: AppState,
    phase: Phase,
    /// One-shot latch: set before the analysis call is issued and never
    /// reset for the lifetime of that `Submitting` phase instance. Re-armed
    /// only when a new submission begins.
    analysis_started: bool,
    /// Disables re-triggering while an upload is outstanding.
    uploading: bool,
}

impl Workflow {
    pub fn new(api: Arc<dyn GapApi>, state: AppState) -> Self {
        Self {
            api,
            state,
            phase: Phase::Initializing,
            analysis_started: false,
            uploading: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    // ── Gates ───────────────────────────────────────────────────────────

    pub fn has_resume(&self) -> bool {
        self.state.resume().is_some()
    }

    pub fn can_submit(&self) -> bool {
        self.validate_submission().is_ok()
    }

    /// Checks the submission preconditions in their fixed priority order:
    /// credential, then résumé, then job-description length.
    fn validate_submission(&self) -> Result<(), AppError> {
        if self.state.api_key().is_none() {
            return Err(AppError::Validation(
                "Enter your OpenAI API key before analyzing".to_string(),
            ));
        }
        if self.state.resume().is_none() {
            return Err(AppError::Validation(
                "Upload a resume before analyzing".to_string(),
            ));
        }
        if self.state.jd_text().trim().chars().count() < MIN_JD_CHARS {
            return Err(AppError::Validation(
                "Job description is too short; paste the full posting".to_string(),
            ));
        }
        Ok(())
    }

    // ── Input mutators (forwarded to the container) ─────────────────────

    pub fn set_api_key(&mut self, key: Option<String>) {
        self.state.set_api_key(key);
    }

    pub fn set_job_description(&mut self, jd_text: String, target_role: String) {
        self.state.set_job_description(jd_text, target_role);
    }

    // ── Startup ─────────────────────────────────────────────────────────

    /// Runs the full startup sequence: liveness probe, revalidation of any
    /// persisted session, and fallback session creation.
    ///
    /// A stale or missing persisted session is never surfaced to the user;
    /// the only fatal outcome is an unreachable backend (`Offline`).
    pub async fn initialize(&mut self) {
        self.phase = Phase::Initializing;

        let online = self.api.health_check().await;
        self.state.set_backend_online(online);
        if !online {
            info!("backend unreachable, entering offline state");
            self.phase = Phase::Offline;
            return;
        }

        // Revalidate a previously persisted session before creating one.
        if let Some(id) = self.state.session_id().map(str::to_string) {
            match self.api.get_session(&id).await {
                Ok(session) => {
                    if session.has_resume && self.state.resume().is_none() {
                        // The backend already holds a parsed résumé for this
                        // session; satisfy the upload gate without re-uploading.
                        self.state.set_resume(Some(ResumeInfo::placeholder(&id)));
                    }
                    debug!("resumed session {id}");
                    self.phase = Phase::Ready;
                    return;
                }
                Err(e) => debug!("persisted session invalid ({e}), creating a new one"),
            }
        }

        match self.api.create_session().await {
            Ok(session) => {
                info!("session created: {}", session.session_id);
                self.state.set_session(session.session_id);
            }
            Err(e) => {
                self.state
                    .set_error(Some(WorkflowError::new(&e, ErrorPhase::Startup)));
            }
        }
        self.phase = Phase::Ready;
    }

    /// Manual retry from `Offline`: re-runs the entire startup sequence.
    pub async fn retry_connection(&mut self) {
        self.initialize().await;
    }

    // ── Upload ──────────────────────────────────────────────────────────

    /// Uploads a résumé for the active session. A no-op while a prior upload
    /// is outstanding; unsupported file types are rejected locally.
    pub async fn upload_resume(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
        on_progress: Option<ProgressFn>,
    ) -> Result<(), AppError> {
        if self.uploading {
            debug!("upload already in flight, ignoring");
            return Ok(());
        }
        if resume_mime(file_name).is_none() {
            return Err(AppError::Validation(format!(
                "Unsupported file type '{file_name}'; use PDF, DOCX, or TXT"
            )));
        }
        let Some(session_id) = self.state.session_id().map(str::to_string) else {
            return Err(AppError::Validation(
                "No active session; retry the connection first".to_string(),
            ));
        };

        self.uploading = true;
        let result = self
            .api
            .upload_resume(&session_id, file_name, bytes, on_progress)
            .await;
        self.uploading = false;

        match result {
            Ok(info) => {
                info!("resume uploaded: {} chars extracted", info.text_chars);
                self.state.set_resume(Some(info));
                self.state.set_error(None);
                Ok(())
            }
            Err(e) => {
                self.state
                    .set_error(Some(WorkflowError::new(&e, ErrorPhase::Upload)));
                Err(e)
            }
        }
    }

    // ── Submission ──────────────────────────────────────────────────────

    /// Re-validates all preconditions and, if they hold, enters `Submitting`
    /// with a freshly armed one-shot latch. A no-op outside `Ready`.
    pub fn begin_submission(&mut self) -> Result<(), AppError> {
        match self.phase {
            Phase::Ready => {}
            Phase::Submitting => {
                debug!("submission already in flight, ignoring");
                return Ok(());
            }
            _ => {
                debug!("submission attempted outside Ready, ignoring");
                return Ok(());
            }
        }

        if let Err(e) = self.validate_submission() {
            self.state
                .set_error(Some(WorkflowError::new(&e, ErrorPhase::Submission)));
            return Err(e);
        }

        self.state.set_error(None);
        self.analysis_started = false;
        self.phase = Phase::Submitting;
        Ok(())
    }

    /// Executes the analysis call for the current `Submitting` phase
    /// instance. Guaranteed to issue the remote call at most once per
    /// instance: the latch is set before the call begins, and duplicate
    /// invocations (or invocations outside `Submitting`) are no-ops.
    pub async fn run_analysis(&mut self) -> Result<(), AppError> {
        if self.phase != Phase::Submitting || self.analysis_started {
            return Ok(());
        }
        self.analysis_started = true;

        let Some(session_id) = self.state.session_id().map(str::to_string) else {
            let e = AppError::Validation("No active session; start over".to_string());
            self.state
                .set_error(Some(WorkflowError::new(&e, ErrorPhase::Submission)));
            self.phase = Phase::Ready;
            return Err(e);
        };

        let target_role = self.state.target_role().trim();
        let request = GapRequest {
            session_id,
            jd_text: self.state.jd_text().to_string(),
            target_role: (!target_role.is_empty()).then(|| target_role.to_string()),
        };
        let credential = self.state.api_key().map(str::to_string);

        match self.api.analyze_gap(&request, credential.as_deref()).await {
            Ok(report) => {
                info!("analysis complete: match score {}", report.match_score);
                self.state.set_result(report);
                self.state.set_error(None);
                self.phase = Phase::Succeeded;
                Ok(())
            }
            Err(e) => {
                // Only the error field changes: the user can correct input
                // and resubmit without re-uploading or re-entering the key.
                self.state
                    .set_error(Some(WorkflowError::new(&e, ErrorPhase::Submission)));
                self.phase = Phase::Ready;
                Err(e)
            }
        }
    }

    /// Full submission: guard, then the one-shot analysis call.
    pub async fn submit(&mut self) -> Result<(), AppError> {
        self.begin_submission()?;
        self.run_analysis().await
    }

    // ── Reset ───────────────────────────────────────────────────────────

    /// "Start over": tears down all state (except the reachability flag) and
    /// re-enters the full startup sequence, health probe included, so the
    /// workflow never operates on a stale reachability reading.
    pub async fn start_over(&mut self) {
        self.state.reset_all();
        self.analysis_started = false;
        self.initialize().await;
    }
}
