//! Client configuration.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default backend address, including the `/api` prefix.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

const CREDENTIALS_FILE: &str = "credentials.json";

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL (e.g. `http://localhost:8000/api`).
    pub api_url: String,

    /// Directory holding persisted client state.
    pub home: PathBuf,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Dashboard refresh cadence.
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var("RFID_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let home = match std::env::var_os("RFID_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => default_home()?,
        };

        let timeout_secs = positive_secs(std::env::var("RFID_HTTP_TIMEOUT").ok(), 30);
        let poll_secs = positive_secs(std::env::var("RFID_POLL_INTERVAL").ok(), 30);

        Ok(Self {
            api_url: normalize_api_url(&api_url),
            home,
            timeout: Duration::from_secs(timeout_secs),
            poll_interval: Duration::from_secs(poll_secs),
        })
    }

    /// Override the backend address.
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = normalize_api_url(api_url);
        self
    }

    /// Location of the persisted token/profile document.
    pub fn credentials_path(&self) -> PathBuf {
        self.home.join(CREDENTIALS_FILE)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            home: default_home().unwrap_or_else(|_| PathBuf::from(".rfid")),
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(30),
        }
    }
}

fn default_home() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".rfid"))
}

/// Parse a whole number of seconds; zero and garbage fall back to `default`.
fn positive_secs(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|s| s.trim().parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default)
}

/// An absolute http(s) URL with a host.
pub fn is_valid_api_url(api_url: &str) -> bool {
    match url::Url::parse(api_url) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

/// Strip trailing slashes so paths can be appended with `format!`.
pub fn normalize_api_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
