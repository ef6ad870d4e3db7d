//! Configuration schema for the bridge server.
//!
//! Every section is optional in YAML; missing sections and fields fall back to
//! the defaults below, so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Listening socket settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Temporal feature window settings.
    #[serde(default)]
    pub window: WindowConfig,
    /// Sequence model artifact.
    #[serde(default)]
    pub model: ModelConfig,
    /// Per-session policies.
    #[serde(default)]
    pub session: SessionConfig,
    /// Event log settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listening socket configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:6969").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Disable Nagle on accepted connections.
    #[serde(default = "default_nodelay")]
    pub nodelay: bool,
    /// Largest accepted payload in bytes.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: u32,
    /// Stop after this many sessions. `None` serves forever.
    #[serde(default)]
    pub max_sessions: Option<u64>,
}

fn default_bind() -> String {
    "127.0.0.1:6969".to_string()
}

fn default_nodelay() -> bool {
    true
}

fn default_max_frame_len() -> u32 {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            nodelay: default_nodelay(),
            max_frame_len: default_max_frame_len(),
            max_sessions: None,
        }
    }
}

/// Feature window configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WindowConfig {
    /// Number of time steps fed to the model.
    #[serde(default = "default_window_len")]
    pub len: usize,
    /// Dimension of one feature vector. Must match the model input.
    #[serde(default = "default_feature_dim")]
    pub feature_dim: usize,
}

fn default_window_len() -> usize {
    10
}

fn default_feature_dim() -> usize {
    26
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            len: default_window_len(),
            feature_dim: default_feature_dim(),
        }
    }
}

/// Model artifact configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Path to the safetensors weights. Relative paths resolve against the
    /// directory of the running executable.
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model.safetensors")
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
        }
    }
}

impl ModelConfig {
    /// Resolve `path` against `base` unless it is already absolute.
    pub fn resolve_against(&self, base: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            base.join(&self.path)
        }
    }

    /// Resolve `path` against the directory holding the current executable.
    pub fn resolve(&self) -> Result<PathBuf, ConfigError> {
        if self.path.is_absolute() {
            return Ok(self.path.clone());
        }
        let exe = std::env::current_exe()?;
        let dir = exe
            .parent()
            .ok_or_else(|| ConfigError::Invalid("executable has no parent directory".into()))?;
        Ok(self.resolve_against(dir))
    }
}

/// What a session does with a payload that fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// End the session without replying.
    #[default]
    Terminate,
    /// Drop the payload without replying and keep reading.
    Skip,
}

/// Per-session configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub on_malformed: MalformedPolicy,
}

/// NDJSON event log configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Append session events here when set.
    #[serde(default)]
    pub events_path: Option<PathBuf>,
    /// Flush the event log every N lines (0 disables periodic flushing).
    #[serde(default = "default_flush_every_lines")]
    pub flush_every_lines: u64,
}

fn default_flush_every_lines() -> u64 {
    1
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            events_path: None,
            flush_every_lines: default_flush_every_lines(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind must be non-empty".into()));
        }
        if self.server.max_frame_len < 8 {
            return Err(ConfigError::Invalid(
                "server.max_frame_len must be >= 8".into(),
            ));
        }
        if self.server.max_sessions == Some(0) {
            return Err(ConfigError::Invalid(
                "server.max_sessions must be >= 1 when set".into(),
            ));
        }
        if self.window.len < 1 {
            return Err(ConfigError::Invalid("window.len must be >= 1".into()));
        }
        if self.window.feature_dim < 1 {
            return Err(ConfigError::Invalid(
                "window.feature_dim must be >= 1".into(),
            ));
        }
        if self.model.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("model.path must be non-empty".into()));
        }
        Ok(())
    }
}
