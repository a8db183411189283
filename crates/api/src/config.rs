//! Server configuration
//!
//! Values come from built-in defaults, then a config file, then
//! `DESCRIBE_IMAGE__*` environment variables (`__` separates nesting, e.g.
//! `DESCRIBE_IMAGE__SERVER__PORT=8080`). The default config file is optional;
//! a file named by `DESCRIBE_IMAGE_CONFIG` must exist.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use image_classifier::ClassifierConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "DESCRIBE_IMAGE_CONFIG";

/// Config file looked up when [`CONFIG_PATH_ENV`] is unset (any supported extension)
pub const DEFAULT_CONFIG_FILE: &str = "describe-image";

const ENV_PREFIX: &str = "DESCRIBE_IMAGE";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub model: ClassifierConfig,
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Upload staging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory holding uploads while they are processed
    pub dir: PathBuf,

    /// Multipart field carrying the image
    pub field_name: String,

    /// Maximum request body size in bytes
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            field_name: "image".to_string(),
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Max level: trace, debug, info, warn, error
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load from the default file locations and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let (path, required) = config_file(std::env::var(CONFIG_PATH_ENV).ok());
        Self::from_sources(&path, required, environment())
    }

    /// Layer `file` and `env` over the defaults. A missing `file` is an error
    /// only when `required` is set.
    pub fn from_sources(file: &Path, required: bool, env: Environment) -> Result<Self, ConfigError> {
        let name = file.to_string_lossy();
        Config::builder()
            .add_source(File::with_name(&name).required(required))
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}

/// Config file to read and whether it must exist
fn config_file(explicit: Option<String>) -> (PathBuf, bool) {
    match explicit {
        Some(path) => (PathBuf::from(path), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    }
}

/// Environment source using the `DESCRIBE_IMAGE__` prefix
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
