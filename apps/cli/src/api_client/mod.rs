//! API client — the single point of entry for all backend calls.
//!
//! ARCHITECTURAL RULE: no other module may touch HTTP directly. Every call
//! carries its own timeout; expiry aborts the in-flight request and surfaces
//! as the operation's ordinary failure, so the workflow layer sees one closed
//! error taxonomy and never a raw transport error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::analysis::{GapReport, GapRequest};
use crate::models::session::{ResumeInfo, Session};

/// Header carrying the user-supplied access key. Out-of-band by design: the
/// key must never appear in a JSON payload.
const CREDENTIAL_HEADER: &str = "X-OpenAI-Key";

const SESSION_TIMEOUT: Duration = Duration::from_secs(5);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
/// Generous bound for the analysis call, which drives a remote LLM
/// computation. Every other endpoint only touches fast metadata.
const ANALYZE_TIMEOUT: Duration = Duration::from_secs(60);
/// Short bound: liveness polling must fail fast.
const HEALTH_TIMEOUT: Duration = Duration::from_millis(2500);

const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Best-effort observer for upload progress, invoked with 0–100 as bytes are
/// handed to the transport.
pub type ProgressFn = Box<dyn Fn(u8) + Send + Sync>;

/// The remote operations the workflow depends on. Kept behind a trait so the
/// state machine takes an `Arc<dyn GapApi>` and tests can inject a fake.
#[async_trait]
pub trait GapApi: Send + Sync {
    async fn health_check(&self) -> bool;
    async fn create_session(&self) -> Result<Session, AppError>;
    async fn get_session(&self, session_id: &str) -> Result<Session, AppError>;
    async fn upload_resume(
        &self,
        session_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        on_progress: Option<ProgressFn>,
    ) -> Result<ResumeInfo, AppError>;
    async fn analyze_gap(
        &self,
        request: &GapRequest,
        credential: Option<&str>,
    ) -> Result<GapReport, AppError>;
}

/// Error body shape used by the backend: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Maps a résumé file name to the MIME type the backend accepts.
/// Returns `None` for unsupported types (used as a local pre-upload filter).
pub fn resume_mime(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "docx" => {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        "txt" => Some("text/plain"),
        _ => None,
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the deployment-specific API root, e.g.
    /// `http://127.0.0.1:8002/api`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Extracts the server-supplied `detail` message from a non-success
    /// response, falling back to `fallback` when the body is unparseable.
    async fn detail_or(response: Response, fallback: &str) -> String {
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.detail)
            .unwrap_or_else(|_| fallback.to_string())
    }
}

#[async_trait]
impl GapApi for ApiClient {
    /// Never errors: any failure (timeout, refused connection, non-2xx) is
    /// reported as `false`.
    async fn health_check(&self) -> bool {
        let result = self
            .client
            .get(self.url("/health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;
        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("health check failed: {e}");
                false
            }
        }
    }

    async fn create_session(&self) -> Result<Session, AppError> {
        let response = self
            .client
            .post(self.url("/sessions"))
            .timeout(SESSION_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::SessionCreate(e.to_string()))?;

        if !response.status().is_success() {
            let detail = Self::detail_or(response, "Failed to create session").await;
            return Err(AppError::SessionCreate(detail));
        }
        let session: Session = response
            .json()
            .await
            .map_err(|e| AppError::SessionCreate(e.to_string()))?;
        debug!("session created: {}", session.session_id);
        Ok(session)
    }

    async fn get_session(&self, session_id: &str) -> Result<Session, AppError> {
        let response = self
            .client
            .get(self.url(&format!("/sessions/{session_id}")))
            .timeout(SESSION_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::SessionFetch(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::SessionNotFound);
        }
        if !response.status().is_success() {
            let detail = Self::detail_or(response, "Failed to get session").await;
            return Err(AppError::SessionFetch(detail));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::SessionFetch(e.to_string()))
    }

    async fn upload_resume(
        &self,
        session_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        on_progress: Option<ProgressFn>,
    ) -> Result<ResumeInfo, AppError> {
        let mime = resume_mime(file_name).unwrap_or("application/octet-stream");
        let total = bytes.len();

        if let Some(cb) = &on_progress {
            cb(0);
        }

        // Feed the body to the transport in chunks so progress can be
        // observed as bytes are sent. Percent only ever increases.
        let chunks: Vec<Vec<u8>> = if bytes.is_empty() {
            vec![Vec::new()]
        } else {
            bytes.chunks(UPLOAD_CHUNK_BYTES).map(<[u8]>::to_vec).collect()
        };
        let mut sent = 0usize;
        let mut last_reported = 0u8;
        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len();
            let percent = if total == 0 {
                100
            } else {
                ((sent * 100) / total) as u8
            };
            if let Some(cb) = &on_progress {
                if percent > last_reported {
                    last_reported = percent;
                    cb(percent);
                }
            }
            Ok::<Vec<u8>, std::io::Error>(chunk)
        }));

        let part = Part::stream_with_length(Body::wrap_stream(stream), total as u64)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| AppError::Upload(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(&format!("/sessions/{session_id}/resume")))
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            let detail = Self::detail_or(response, "Upload failed").await;
            return Err(AppError::Upload(detail));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))
    }

    async fn analyze_gap(
        &self,
        request: &GapRequest,
        credential: Option<&str>,
    ) -> Result<GapReport, AppError> {
        let mut builder = self
            .client
            .post(self.url("/analyze/jd-gap"))
            .timeout(ANALYZE_TIMEOUT)
            .json(request);
        if let Some(key) = credential {
            builder = builder.header(CREDENTIAL_HEADER, key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Analysis(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = Self::detail_or(response, "Analysis failed").await;
            warn!("analysis returned {status}: {detail}");
            return Err(AppError::Analysis(detail));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::Analysis(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn session_body(id: &str, has_resume: bool) -> serde_json::Value {
        serde_json::json!({
            "session_id": id,
            "expires_at": "2026-08-31T12:00:00Z",
            "has_resume": has_resume
        })
    }

    fn report_body(score: u8) -> serde_json::Value {
        serde_json::json!({
            "match_score": score,
            "summary": "ok",
            "strengths": [],
            "gaps": [],
            "keywords": [],
            "craft_questions": []
        })
    }

    #[tokio::test]
    async fn test_create_session_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("s1", false)))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let session = client.create_session().await.unwrap();
        assert_eq!(session.session_id, "s1");
        assert!(!session.has_resume);
    }

    #[tokio::test]
    async fn test_create_session_surfaces_detail_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"detail": "session store full"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let err = client.create_session().await.unwrap_err();
        assert_eq!(err, AppError::SessionCreate("session store full".to_string()));
    }

    #[tokio::test]
    async fn test_create_session_falls_back_on_unparseable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let err = client.create_session().await.unwrap_err();
        assert_eq!(
            err,
            AppError::SessionCreate("Failed to create session".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_session_maps_404_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/s-old"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let err = client.get_session("s-old").await.unwrap_err();
        assert_eq!(err, AppError::SessionNotFound);
    }

    #[tokio::test]
    async fn test_get_session_is_idempotent_for_valid_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("s1", true)))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let first = client.get_session("s1").await.unwrap();
        let second = client.get_session("s1").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_upload_resume_reports_monotonic_progress_to_100() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/s1/resume"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "session_id": "s1",
                "file_name": "resume.pdf",
                "file_type": "application/pdf",
                "text_chars": 1200
            })))
            .mount(&server)
            .await;

        let observed: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let on_progress: ProgressFn = Box::new(move |pct| sink.lock().unwrap().push(pct));

        let client = ApiClient::new(server.uri());
        let info = client
            .upload_resume("s1", "resume.pdf", vec![0u8; 200 * 1024], Some(on_progress))
            .await
            .unwrap();
        assert_eq!(info.text_chars, 1200);

        let observed = observed.lock().unwrap();
        assert_eq!(observed.first(), Some(&0));
        assert_eq!(observed.last(), Some(&100));
        assert!(observed.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_upload_resume_tolerates_absent_progress_callback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/s1/resume"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "session_id": "s1",
                "file_name": "resume.txt",
                "file_type": "text/plain",
                "text_chars": 40
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let info = client
            .upload_resume("s1", "resume.txt", b"plain text resume".to_vec(), None)
            .await
            .unwrap();
        assert_eq!(info.file_type, "text/plain");
    }

    #[tokio::test]
    async fn test_upload_resume_surfaces_detail_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/s1/resume"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({"detail": "file too large"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let err = client
            .upload_resume("s1", "resume.pdf", vec![1, 2, 3], None)
            .await
            .unwrap_err();
        assert_eq!(err, AppError::Upload("file too large".to_string()));
    }

    #[tokio::test]
    async fn test_analyze_gap_sends_credential_as_header_only() {
        let server = MockServer::start().await;
        let request = GapRequest {
            session_id: "s1".to_string(),
            jd_text: "x".repeat(60),
            target_role: None,
        };
        // Matching on the exact JSON body proves the key is not in it.
        Mock::given(method("POST"))
            .and(path("/analyze/jd-gap"))
            .and(header(CREDENTIAL_HEADER, "sk-test-1234"))
            .and(body_json(&request))
            .respond_with(ResponseTemplate::new(200).set_body_json(report_body(72)))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let report = client
            .analyze_gap(&request, Some("sk-test-1234"))
            .await
            .unwrap();
        assert_eq!(report.match_score, 72);
    }

    #[tokio::test]
    async fn test_analyze_gap_omits_credential_header_when_absent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze/jd-gap"))
            .respond_with(ResponseTemplate::new(200).set_body_json(report_body(50)))
            .mount(&server)
            .await;

        let request = GapRequest {
            session_id: "s1".to_string(),
            jd_text: "x".repeat(60),
            target_role: None,
        };
        let client = ApiClient::new(server.uri());
        client.analyze_gap(&request, None).await.unwrap();

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get(CREDENTIAL_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_analyze_gap_surfaces_detail_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze/jd-gap"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"detail": "invalid API key"})),
            )
            .mount(&server)
            .await;

        let request = GapRequest {
            session_id: "s1".to_string(),
            jd_text: "x".repeat(60),
            target_role: None,
        };
        let client = ApiClient::new(server.uri());
        let err = client.analyze_gap(&request, Some("sk-bad")).await.unwrap_err();
        assert_eq!(err, AppError::Analysis("invalid API key".to_string()));
    }

    #[tokio::test]
    async fn test_health_check_true_on_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_false_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        assert!(!client.health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_false_when_unreachable() {
        // Nothing is listening on this port.
        let client = ApiClient::new("http://127.0.0.1:1".to_string());
        assert!(!client.health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_false_on_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(4)))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let start = std::time::Instant::now();
        assert!(!client.health_check().await);
        // The abortable timer must fire at the 2.5s bound, not wait out the
        // full server delay.
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_resume_mime_accepts_pdf_docx_txt() {
        assert_eq!(resume_mime("cv.pdf"), Some("application/pdf"));
        assert_eq!(
            resume_mime("cv.DOCX"),
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        );
        assert_eq!(resume_mime("cv.txt"), Some("text/plain"));
    }

    #[test]
    fn test_resume_mime_rejects_other_types() {
        assert_eq!(resume_mime("cv.png"), None);
        assert_eq!(resume_mime("archive.zip"), None);
        assert_eq!(resume_mime("noextension"), None);
    }
}
