//! Helpdesk client configuration
//!
//! Lives in `~/.config/helpdesk/config.toml` unless `--config` or
//! `$HELPDESK_CONFIG` points elsewhere. A missing default file means defaults.
//!
//! Environment overrides:
//! - `HELPDESK_BACKEND_URL`
//! - `HELPDESK_SESSION_COOKIE`

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.toml";
const APP_DIR: &str = "helpdesk";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpdeskConfig {
    /// Backend origin, e.g. `http://10.2.22.54:8080`
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// STOMP-over-WebSocket endpoint; derived from `backend_url` when unset
    #[serde(default)]
    pub push_url: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Delay before re-establishing a dropped push connection
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_heartbeat")]
    pub heartbeat_outgoing_ms: u64,

    #[serde(default = "default_heartbeat")]
    pub heartbeat_incoming_ms: u64,

    /// How long a live-updated ticket stays highlighted
    #[serde(default = "default_highlight")]
    pub highlight_ms: u64,

    /// Ring the terminal bell on critical alerts
    #[serde(default = "default_alert_sound")]
    pub alert_sound: bool,

    /// Backend session cookie (`NAME=value`) forwarded on every request
    #[serde(default)]
    pub session_cookie: Option<String>,

    /// Where client state (pending redirect, logs) is kept
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

fn default_backend_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_reconnect_delay() -> u64 {
    5000
}

fn default_heartbeat() -> u64 {
    4000
}

fn default_highlight() -> u64 {
    3000
}

fn default_alert_sound() -> bool {
    true
}

impl Default for HelpdeskConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            push_url: None,
            request_timeout_secs: default_request_timeout(),
            reconnect_delay_ms: default_reconnect_delay(),
            heartbeat_outgoing_ms: default_heartbeat(),
            heartbeat_incoming_ms: default_heartbeat(),
            highlight_ms: default_highlight(),
            alert_sound: default_alert_sound(),
            session_cookie: None,
            state_dir: None,
        }
    }
}

impl HelpdeskConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. Explicit path (must exist)
    /// 2. $HELPDESK_CONFIG (must exist)
    /// 3. ~/.config/helpdesk/config.toml (optional)
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os("HELPDESK_CONFIG").map(PathBuf::from);

        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a single TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("HELPDESK_BACKEND_URL") {
            if !url.trim().is_empty() {
                self.backend_url = url.trim().to_string();
            }
        }
        if let Ok(cookie) = std::env::var("HELPDESK_SESSION_COOKIE") {
            if !cookie.trim().is_empty() {
                self.session_cookie = Some(cookie.trim().to_string());
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend_url.trim();
        let host = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"));
        match host {
            Some(rest) if !rest.trim_matches('/').is_empty() => Ok(()),
            _ => Err(ConfigError::BackendUrl(self.backend_url.clone())),
        }
    }

    /// Backend origin without a trailing slash
    pub fn backend_base(&self) -> &str {
        self.backend_url.trim().trim_end_matches('/')
    }

    /// Push endpoint: explicit `push_url`, else `ws(s)://<backend>/ws/websocket`
    pub fn effective_push_url(&self) -> String {
        if let Some(url) = self.push_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return url.trim().to_string();
        }

        let base = self.backend_base();
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/ws/websocket", ws_base)
    }

    /// Client state directory with fallback chain
    ///
    /// Priority:
    /// 1. `state_dir` from the config file
    /// 2. $XDG_STATE_HOME/helpdesk
    /// 3. ~/.local/state/helpdesk
    /// 4. <tmp>/helpdesk
    pub fn effective_state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        if let Some(xdg_state) = std::env::var_os("XDG_STATE_HOME") {
            return PathBuf::from(xdg_state).join(APP_DIR);
        }
        if let Some(home) = dirs::home_dir() {
            return home.join(".local/state").join(APP_DIR);
        }
        std::env::temp_dir().join(APP_DIR)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }
}
