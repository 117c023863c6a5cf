use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths::{config_json_path, default_storage_dir};

const CONFIG_FILE_PATH: &str = "widget.toml";
const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetPosition {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    #[serde(default = "default_primary_color")]
    pub primary_color: String,
    #[serde(default)]
    pub position: WidgetPosition,
    #[serde(default)]
    pub size: WidgetSize,
}

fn default_primary_color() -> String {
    "#007bff".to_string()
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: default_primary_color(),
            position: WidgetPosition::default(),
            size: WidgetSize::default(),
        }
    }
}

/// Unit revealed per typewriter tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevealMode {
    #[default]
    Character,
    /// One space-separated word per tick (admin testing surface).
    Word,
}

/// When suggestion and follow-up blocks appear relative to the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FollowUpTiming {
    /// `answer length x per-char pacing + buffer`, and never before the
    /// answer's reveal has completed.
    #[default]
    Heuristic,
    /// Wait for the reveal's completion signal, then the buffer.
    AfterReveal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PacingConfig {
    pub reveal_mode: RevealMode,
    pub char_interval_ms: u64,
    pub word_interval_ms: u64,
    pub per_char_delay_ms: u64,
    pub suggestion_buffer_ms: u64,
    pub follow_up_buffer_ms: u64,
    pub follow_up_timing: FollowUpTiming,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            reveal_mode: RevealMode::Character,
            char_interval_ms: 30,
            word_interval_ms: 100,
            per_char_delay_ms: 30,
            suggestion_buffer_ms: 500,
            follow_up_buffer_ms: 800,
            follow_up_timing: FollowUpTiming::Heuristic,
        }
    }
}

impl PacingConfig {
    pub fn reveal_interval(&self) -> Duration {
        let millis = match self.reveal_mode {
            RevealMode::Character => self.char_interval_ms,
            RevealMode::Word => self.word_interval_ms,
        };
        Duration::from_millis(millis.max(1))
    }

    fn scaled(&self, answer: &str, buffer_ms: u64) -> Duration {
        match self.follow_up_timing {
            FollowUpTiming::Heuristic => {
                let chars = answer.chars().count() as u64;
                Duration::from_millis(chars * self.per_char_delay_ms + buffer_ms)
            }
            FollowUpTiming::AfterReveal => Duration::from_millis(buffer_ms),
        }
    }

    /// Delay before the suggestion block for an answer of this text.
    pub fn suggestion_delay(&self, answer: &str) -> Duration {
        self.scaled(answer, self.suggestion_buffer_ms)
    }

    /// Delay before the follow-up block; trails suggestions by construction.
    pub fn follow_up_delay(&self, answer: &str) -> Duration {
        self.scaled(answer, self.follow_up_buffer_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    /// Automatic retries of transient transport failures. Zero keeps
    /// one user action equal to one request.
    #[serde(default)]
    pub transport_retries: u32,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            api_url: default_api_url(),
            theme: Theme::default(),
            pacing: PacingConfig::default(),
            storage_dir: None,
            transport_retries: 0,
        }
    }
}

impl WidgetConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Load from `~/.chat-widget/config.json`, else `./widget.toml`, then
    /// apply `WIDGET_*` environment overrides.
    pub fn load() -> Self {
        let mut config = WidgetConfig::default();

        let mut loaded = false;
        let json_path = config_json_path();
        if json_path.exists() {
            match Self::from_json_file(&json_path) {
                Ok(file_config) => {
                    config = file_config;
                    loaded = true;
                }
                Err(e) => warn!("Ignoring {}: {}", json_path.display(), e),
            }
        }

        if !loaded && Path::new(CONFIG_FILE_PATH).exists() {
            match std::fs::read_to_string(CONFIG_FILE_PATH)
                .map_err(ConfigError::from)
                .and_then(|content| Self::from_toml_str(&content))
            {
                Ok(file_config) => config = file_config,
                Err(e) => warn!("Ignoring {}: {}", CONFIG_FILE_PATH, e),
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(client_id) = lookup("WIDGET_CLIENT_ID") {
            self.client_id = client_id;
        }
        if let Some(api_url) = lookup("WIDGET_API_URL") {
            self.api_url = api_url;
        }
        if let Some(storage_dir) = lookup("WIDGET_STORAGE_DIR") {
            self.storage_dir = Some(PathBuf::from(storage_dir));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::MissingClientId);
        }
        let parsed = url::Url::parse(&self.api_url).map_err(|e| ConfigError::InvalidApiUrl {
            url: self.api_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidApiUrl {
                url: self.api_url.clone(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        Ok(())
    }

    /// API base without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(default_storage_dir)
    }
}
