use std::path::PathBuf;

use anyhow::Result;

/// Application configuration loaded from environment variables.
/// Every value has a sensible default, so a bare invocation works against a
/// locally running backend.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the analysis backend API.
    pub api_base: String,
    /// Directory holding the durable session-id and access-key files.
    pub data_dir: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_base: std::env::var("CAREERGAP_API_BASE")
                .unwrap_or_else(|_| "http://127.0.0.1:8002/api".to_string()),
            data_dir: std::env::var("CAREERGAP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir()),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("careergap")
}
