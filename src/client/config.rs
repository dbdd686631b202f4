// Configuration module for the scoreboard

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::core::constants::{DEFAULT_INACTIVITY_TIMEOUT, DEFAULT_SERVER_URL};
use crate::core::session::SessionSettings;
use crate::core::timing::FormFactor;

// =============================================================================
// CONFIGURATION STRUCTURES
// =============================================================================

/// Timing server connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// WebSocket endpoint; http(s) URLs are rewritten to ws(s)
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_auto_reconnect() -> bool {
    true
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            auto_reconnect: default_auto_reconnect(),
        }
    }
}

impl ServerSettings {
    /// Endpoint with the scheme normalized to ws:// or wss://
    pub fn ws_url(&self) -> String {
        let url = self.url.trim();
        if let Some(rest) = url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            url.to_string()
        }
    }
}

/// Display layout settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplaySettings {
    #[serde(default)]
    pub form_factor: FormFactor,
    /// Keep the list static (manual navigation only)
    #[serde(default)]
    pub disable_scrolling: bool,
    /// Canvas width for the custom form factor
    #[serde(default)]
    pub width: Option<u32>,
    /// Canvas height for the custom form factor
    #[serde(default)]
    pub height: Option<u32>,
    /// Row height in pixels; defaults per form factor
    #[serde(default)]
    pub row_height: Option<f32>,
    /// Height of the results viewport in pixels; defaults to the canvas height
    #[serde(default)]
    pub viewport_height: Option<f32>,
}

impl DisplaySettings {
    pub fn canvas_size(&self) -> (u32, u32) {
        let (w, h) = self.form_factor.canvas_size();
        match self.form_factor {
            FormFactor::Custom => (self.width.unwrap_or(w), self.height.unwrap_or(h)),
            _ => (w, h),
        }
    }

    pub fn row_height(&self) -> f32 {
        self.row_height
            .unwrap_or_else(|| self.form_factor.row_height())
    }

    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
            .unwrap_or_else(|| self.canvas_size().1 as f32)
    }
}

/// Autoscroll tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollSettings {
    /// Idle time after manual navigation before autoscroll resumes
    #[serde(default = "default_inactivity_timeout_ms")]
    pub inactivity_timeout_ms: u64,
    #[serde(default)]
    pub initial_delay_ms: Option<u64>,
    #[serde(default)]
    pub page_interval_ms: Option<u64>,
    #[serde(default)]
    pub bottom_pause_ms: Option<u64>,
}

fn default_inactivity_timeout_ms() -> u64 {
    DEFAULT_INACTIVITY_TIMEOUT.as_millis() as u64
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            inactivity_timeout_ms: default_inactivity_timeout_ms(),
            initial_delay_ms: None,
            page_interval_ms: None,
            bottom_pause_ms: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Write logs to stderr
    #[serde(default = "default_console")]
    pub console: bool,
    /// Log file path (relative to the config file or absolute). Empty = no file logging.
    #[serde(default)]
    pub log_file: String,
}

fn default_console() -> bool {
    true
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            console: default_console(),
            log_file: String::new(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub scroll: ScrollSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Directory of the loaded file, for resolving relative paths
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

// =============================================================================
// CONFIG LOADING
// =============================================================================

#[derive(Debug)]
pub enum ConfigError {
    ReadError(std::io::Error),
    ParseError(toml::de::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::ParseError(e) => write!(f, "Failed to parse config file: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError(e) => Some(e),
            ConfigError::ParseError(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl Config {
    pub const CONFIG_FILENAME: &'static str = "scoreboard.toml";

    /// Load configuration from `path`; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "[config] Looking for config");

        let mut config = if path.exists() {
            let contents = fs::read_to_string(path).map_err(ConfigError::ReadError)?;
            let config = Self::from_toml_str(&contents)?;
            info!(path = %path.display(), "[config] Loaded config");
            config
        } else {
            debug!("[config] No config found, using defaults");
            Config::default()
        };

        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.server.ws_url();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ConfigError::Invalid(format!(
                "server.url must be a ws://, wss://, http:// or https:// URL, got '{}'",
                self.server.url
            )));
        }
        if self.display.row_height() <= 0.0 {
            return Err(ConfigError::Invalid(
                "display.row_height must be positive".to_string(),
            ));
        }
        if self.display.viewport_height() <= 0.0 {
            return Err(ConfigError::Invalid(
                "display.viewport_height must be positive".to_string(),
            ));
        }
        if self.scroll.page_interval_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "scroll.page_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Log file path resolved against the config directory
    pub fn log_file_path(&self) -> Option<PathBuf> {
        if self.logging.log_file.is_empty() {
            return None;
        }
        let path = PathBuf::from(&self.logging.log_file);
        if path.is_absolute() {
            return Some(path);
        }
        Some(match &self.base_dir {
            Some(dir) => dir.join(path),
            None => path,
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            form_factor: self.display.form_factor,
            disable_scrolling: self.display.disable_scrolling,
            inactivity_timeout: Duration::from_millis(self.scroll.inactivity_timeout_ms),
            initial_delay_ms: self.scroll.initial_delay_ms,
            page_interval_ms: self.scroll.page_interval_ms,
            bottom_pause_ms: self.scroll.bottom_pause_ms,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
