//! Configuration file handling for veo-director.
//!
//! Loads configuration from `<config dir>/veo-director/config.toml` or a custom path.
//! CLI flags override file values, which override the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gemini::{
    AspectRatio, DriverOptions, Resolution, DEFAULT_LANGUAGE, DEFAULT_POLL_INTERVAL,
    DEFAULT_TEMPERATURE, DEFAULT_TEXT_MODEL, DEFAULT_VIDEO_MODEL, GEMINI_API_BASE_URL,
};

/// Configuration file structure for veo-director.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub compose: ComposeConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub library: LibraryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Used only when neither GEMINI_API_KEY nor API_KEY is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeConfig {
    #[serde(default = "default_text_model")]
    pub model: String,
    /// Source language of the narrative prompt.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            model: default_text_model(),
            language: default_language(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_video_model")]
    pub model: String,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Unset means poll until the upstream reports completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wait_secs: Option<u64>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            model: default_video_model(),
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: None,
        }
    }
}

impl VideoConfig {
    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            max_wait: self.max_wait_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_size_mb: default_max_size_mb(),
        }
    }
}

fn default_base_url() -> String {
    GEMINI_API_BASE_URL.to_string()
}

fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}

fn default_video_model() -> String {
    DEFAULT_VIDEO_MODEL.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_max_size_mb() -> u64 {
    1024
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            Self::load_from_explicit(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from a path that must exist.
    pub fn load_from_explicit(path: PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError { path, source: e })
    }

    /// Render this configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }

    /// Write the default configuration to `path`. Refuses to overwrite.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        let io_err = |e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, Config::default().to_toml()?).map_err(io_err)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    SerializeError(toml::ser::Error),
    AlreadyExists {
        path: PathBuf,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::SerializeError(source) => {
                write!(f, "Failed to render config: {}", source)
            }
            ConfigError::AlreadyExists { path } => {
                write!(f, "Config file '{}' already exists", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::SerializeError(source) => Some(source),
            ConfigError::AlreadyExists { .. } => None,
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("veo-director").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/veo-director/config.toml")
        })
}
