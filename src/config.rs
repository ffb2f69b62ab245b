// src/config.rs

use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Runtime settings shared by the CLI commands.
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    /// Base URL of the RAG service; `/rag/query` is resolved against it.
    pub backend_url: Url,
    /// Minimum spacing between seek markers of one answer.
    pub min_gap_secs: f64,
    pub request_timeout: Duration,
    /// Launch Chromium without a window.
    pub headless: bool,
}

impl AssistantConfig {
    pub fn new(
        backend_url: &str,
        min_gap_secs: f64,
        timeout_secs: u64,
        headless: bool,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            backend_url: parse_backend_url(backend_url)?,
            min_gap_secs: check_min_gap(min_gap_secs)?,
            request_timeout: Duration::from_secs(timeout_secs),
            headless,
        })
    }
}

fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::BackendUrl {
        url: raw.to_string(),
        reason,
    };
    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    // Endpoints are joined onto the base, so the last segment must be a directory.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn check_min_gap(secs: f64) -> Result<f64, ConfigError> {
    if secs.is_finite() && secs >= 0.0 {
        Ok(secs)
    } else {
        Err(ConfigError::MinGap(secs))
    }
}
