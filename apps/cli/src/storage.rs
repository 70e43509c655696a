//! Persistent local state — a durable key/value shadow of the session id and
//! access key, stored file-per-key under the data directory.
//!
//! All operations are infallible from the caller's perspective: read failures
//! return `None`, write/remove failures degrade to no-ops (logged at debug).
//! The workflow must never be interrupted by a storage problem.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

/// Durable key for the active session identifier.
pub const SESSION_KEY: &str = "session_id";
/// Durable key for the user-supplied access key.
pub const API_KEY_KEY: &str = "openai_key";

/// File-per-key store. Values are plain strings, no structured schema.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.dir.join(key)) {
            Ok(value) => {
                let value = value.trim_end_matches('\n').to_string();
                if value.is_empty() {
                    None
                } else {
                    Some(value)
                }
            }
            Err(_) => None,
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            debug!("local store: cannot create {}: {e}", self.dir.display());
            return;
        }
        if let Err(e) = fs::write(self.dir.join(key), value) {
            debug!("local store: dropped write of '{key}': {e}");
        }
    }

    pub fn remove(&self, key: &str) {
        let path = self.dir.join(key);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("local store: failed to remove '{key}': {e}");
            }
        }
    }
}
