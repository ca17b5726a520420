// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use crate::session::STORE_NAME;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1.0";

/// Configuration for the parkbnb API client.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Base URL of the parkbnb API, including the version prefix.
    #[arg(long, default_value = DEFAULT_API_URL, env = "PARKBNB_API_URL")]
    pub api_url: String,

    /// Transport timeout for every request, in milliseconds.
    #[arg(long, default_value_t = 10000, env = "PARKBNB_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// Directory holding the persisted session. Defaults to the XDG state dir.
    #[arg(long, env = "PARKBNB_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Location announced to listeners when a failed refresh ends the session.
    #[arg(long, default_value = "/auth", env = "PARKBNB_AUTH_PATH")]
    pub auth_path: String,
}

impl ClientConfig {
    /// Config with defaults for everything but the API URL.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            timeout_ms: 10000,
            state_dir: None,
            auth_path: "/auth".to_owned(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// API base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    /// Join an endpoint path onto the API base. The leading slash is optional.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base(), path.trim_start_matches('/'))
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(default_state_dir)
    }

    /// Path of the persisted session file.
    pub fn session_path(&self) -> PathBuf {
        self.state_dir().join(format!("{STORE_NAME}.json"))
    }
}

/// Resolve the default state directory.
///
/// Checks `$XDG_STATE_HOME/parkbnb`, then `$HOME/.local/state/parkbnb`.
pub fn default_state_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("parkbnb");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/parkbnb");
    }
    PathBuf::from(".parkbnb")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
