//! TOML configuration for the `irag` client.
//!
//! Every section is optional; a missing config file yields
//! [`Config::minimal`]. The backend base URL can additionally be overridden
//! through the [`API_URL_ENV`] environment variable, which takes precedence
//! over the file.
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000"
//! timeout_secs = 60
//!
//! [upload]
//! max_bytes = 52428800
//! allowed_extensions = ["pdf", "txt"]
//! allowed_mime_types = ["application/pdf", "text/plain"]
//!
//! [chat]
//! request_key = "question"
//!
//! [sources]
//! ordinal_scores = false
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "INSURE_RAG_API_URL";

/// Base URL used when neither the environment nor the config names one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            allowed_extensions: default_allowed_extensions(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

fn default_max_bytes() -> u64 {
    50 * 1024 * 1024
}
fn default_allowed_extensions() -> Vec<String> {
    vec!["pdf".to_string(), "txt".to_string()]
}
fn default_allowed_mime_types() -> Vec<String> {
    vec!["application/pdf".to_string(), "text/plain".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// JSON key carrying the question in `POST /api/chat`.
    #[serde(default = "default_request_key")]
    pub request_key: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            request_key: default_request_key(),
        }
    }
}

fn default_request_key() -> String {
    "question".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    /// Fill in missing scores with the rank-based estimate
    /// `max(0.95 - 0.1 * rank, 0.5)`. Off unless asked for.
    #[serde(default)]
    pub ordinal_scores: bool,
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Resolved backend base URL without a trailing slash.
    ///
    /// Precedence: [`API_URL_ENV`], then `api.base_url`.
    pub fn base_url(&self) -> String {
        let raw = std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.api.base_url.clone());
        raw.trim().trim_end_matches('/').to_string()
    }
}

/// Parse and validate a config from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.api.base_url.trim().is_empty() {
        anyhow::bail!("api.base_url must not be empty");
    }

    if config.api.timeout_secs == 0 {
        anyhow::bail!("api.timeout_secs must be > 0");
    }

    if config.upload.max_bytes == 0 {
        anyhow::bail!("upload.max_bytes must be > 0");
    }

    if config.upload.allowed_extensions.is_empty()
        && config.upload.allowed_mime_types.is_empty()
    {
        anyhow::bail!("upload.allowed_extensions and upload.allowed_mime_types cannot both be empty");
    }

    match config.chat.request_key.as_str() {
        "question" | "query" => {}
        other => anyhow::bail!(
            "Unknown chat.request_key: '{}'. Must be question or query.",
            other
        ),
    }

    Ok(config)
}

/// Load the config at `path`, falling back to [`Config::minimal`] when the
/// file does not exist. A file that exists but fails to parse is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::debug!(
            "config file {} not found, using defaults",
            path.display()
        );
        return Ok(Config::minimal());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.upload.max_bytes, 52_428_800);
        assert_eq!(config.upload.allowed_extensions, vec!["pdf", "txt"]);
        assert_eq!(config.chat.request_key, "question");
        assert!(!config.sources.ordinal_scores);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
[api]
base_url = "http://rag.internal:9000/"

[chat]
request_key = "query"
"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "http://rag.internal:9000/");
        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.chat.request_key, "query");
    }

    #[test]
    fn rejects_unknown_request_key() {
        let err = parse_config("[chat]\nrequest_key = \"prompt\"\n").unwrap_err();
        assert!(err.to_string().contains("request_key"));
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(parse_config("[api]\ntimeout_secs = 0\n").is_err());
    }

    #[test]
    fn rejects_empty_allow_lists() {
        let err = parse_config("[upload]\nallowed_extensions = []\nallowed_mime_types = []\n")
            .unwrap_err();
        assert!(err.to_string().contains("cannot both be empty"));
    }

    #[test]
    fn missing_file_falls_back_to_minimal() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.api.timeout_secs, 60);
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("irag.toml");
        std::fs::write(&path, "[api\nbase_url = ").unwrap();
        assert!(load_config(&path).is_err());
    }
}
