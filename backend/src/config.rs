use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RelayError, RelayResult};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 3000;
pub const MIN_POLLING_INTERVAL_MS: u64 = 100;

/// Values owned by the settings panel. The coordinator only ever flips
/// `enabled` off, when the task server becomes unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub enabled: bool,
    pub server_url: String,
    pub polling_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: DEFAULT_SERVER_URL.to_string(),
            polling_interval_ms: DEFAULT_POLLING_INTERVAL_MS,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> RelayResult<()> {
        if self.server_url.trim().is_empty() {
            return Err(RelayError::InvalidSettings("server URL cannot be empty".into()));
        }
        if self.polling_interval_ms < MIN_POLLING_INTERVAL_MS {
            return Err(RelayError::InvalidSettings(format!(
                "polling interval must be at least {}ms, got {}ms",
                MIN_POLLING_INTERVAL_MS, self.polling_interval_ms
            )));
        }
        Ok(())
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }
}

/// Fixed waits inserted around the host page's asynchronous rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub input_settle_ms: u64,
    pub completion_settle_ms: u64,
    /// How often the completion indicator is sampled.
    pub completion_poll_ms: u64,
    /// `0` waits for the completion signal forever.
    pub completion_timeout_secs: u64,
    /// Per-request bound on task-server calls. `0` leaves requests unbounded.
    pub request_timeout_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            input_settle_ms: 500,
            completion_settle_ms: 500,
            completion_poll_ms: 250,
            completion_timeout_secs: 300,
            request_timeout_secs: 30,
        }
    }
}

impl Timing {
    pub fn input_settle(&self) -> Duration {
        Duration::from_millis(self.input_settle_ms)
    }

    pub fn completion_settle(&self) -> Duration {
        Duration::from_millis(self.completion_settle_ms)
    }

    pub fn completion_poll(&self) -> Duration {
        Duration::from_millis(self.completion_poll_ms.max(1))
    }

    pub fn completion_timeout(&self) -> Option<Duration> {
        match self.completion_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Every host-page selector lives here so a markup change on the chat site
/// only touches configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub url: String,
    pub input_selector: String,
    pub submit_selector: String,
    pub completion_indicator_selector: String,
    pub hidden_class: String,
    pub reply_selector: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            url: "https://gemini.google.com/app".to_string(),
            input_selector: "div.ql-editor.textarea".to_string(),
            submit_selector: "button[aria-label=\"Send message\"], button[aria-label=\"プロンプトを送信\"]".to_string(),
            completion_indicator_selector: ".mic-button-container".to_string(),
            hidden_class: "hidden".to_string(),
            reply_selector: ".response-content .markdown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Attach to a Chrome already listening on this DevTools port before launching one.
    pub debug_port: Option<u16>,
    pub user_data_dir: PathBuf,
    pub headless: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            debug_port: None,
            user_data_dir: PathBuf::from("./isolated_data/gemini"),
            headless: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub settings: Settings,
    pub timing: Timing,
    pub page: PageConfig,
    pub browser: BrowserSettings,
}

impl RelayConfig {
    pub fn load(path: &Path) -> RelayResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> RelayResult<Self> {
        let config: RelayConfig =
            toml::from_str(raw).map_err(|e| RelayError::Config(e.to_string()))?;
        config.settings.validate()?;
        Ok(config)
    }
}
