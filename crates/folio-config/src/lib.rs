//! Configuration management for folio.
//!
//! Parses `folio.toml` with serde and discovers it in the current directory or
//! its parents. CLI settings are applied after loading via [`CliSettings`].
//!
//! ```toml
//! [content]
//! root_dir = "${FOLIO_ROOT:-content}"
//!
//! [refresh]
//! interval_secs = 300
//!
//! [limits]
//! max_script_bytes = 500000
//! max_document_bytes = 2000000
//!
//! [layout]
//! app_prefix = "blog"
//! ```
//!
//! `content.root_dir` supports `${VAR}` and `${VAR:-default}` and is resolved
//! relative to the directory of the config file.

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "folio.toml";

/// Root directory used when none is configured.
const DEFAULT_ROOT_DIR: &str = "content";

/// Longest accepted refresh interval (one day).
const MAX_INTERVAL_SECS: u64 = 86_400;

/// CLI settings that override configuration file values.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the content root directory.
    pub root_dir: Option<PathBuf>,
    /// Override the refresh interval.
    pub interval_secs: Option<u64>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content configuration (root as a raw string from TOML).
    content: ContentConfigRaw,
    pub refresh: RefreshConfig,
    pub limits: LimitsConfig,
    pub layout: LayoutConfig,

    /// Resolved content configuration (set after loading).
    #[serde(skip)]
    pub content_resolved: ContentConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ContentConfigRaw {
    root_dir: Option<String>,
}

/// Resolved content configuration.
#[derive(Debug, Default)]
pub struct ContentConfig {
    /// Canonical content root holding the staging and canonical folders.
    pub root_dir: PathBuf,
}

/// Refresh configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds a refresh stays fresh.
    pub interval_secs: u64,
}

impl RefreshConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

/// File-size ceilings in bytes.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_script_bytes: u64,
    pub max_document_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_script_bytes: 500_000,
            max_document_bytes: 2_000_000,
        }
    }
}

/// Public URL layout.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// First path segment of every public media and script URL.
    pub app_prefix: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            app_prefix: "blog".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`content.root_dir`").
        field: String,
        message: String,
    },
}

fn require_positive(value: u64, field: &str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `folio.toml` in the current directory and its parents, falling back
    /// to defaults relative to the current directory.
    ///
    /// CLI settings are applied after loading and path resolution, and the
    /// result is validated.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit `config_path` doesn't exist, parsing or
    /// expansion fails, or a value is out of range.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }
        config.validate()?;

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(root_dir) = &settings.root_dir {
            self.content_resolved.root_dir.clone_from(root_dir);
        }
        if let Some(interval_secs) = settings.interval_secs {
            self.refresh.interval_secs = interval_secs;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            content: ContentConfigRaw::default(),
            refresh: RefreshConfig::default(),
            limits: LimitsConfig::default(),
            layout: LayoutConfig::default(),
            content_resolved: ContentConfig {
                root_dir: base.join(DEFAULT_ROOT_DIR),
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&text)?;

        config.expand_env_vars()?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.layout.app_prefix;
        if prefix.is_empty() {
            return Err(ConfigError::Validation(
                "layout.app_prefix cannot be empty".to_owned(),
            ));
        }
        if prefix.contains('/') {
            return Err(ConfigError::Validation(
                "layout.app_prefix must be a single path segment".to_owned(),
            ));
        }

        require_positive(self.refresh.interval_secs, "refresh.interval_secs")?;
        if self.refresh.interval_secs > MAX_INTERVAL_SECS {
            return Err(ConfigError::Validation(format!(
                "refresh.interval_secs cannot exceed {MAX_INTERVAL_SECS}"
            )));
        }

        require_positive(self.limits.max_script_bytes, "limits.max_script_bytes")?;
        require_positive(self.limits.max_document_bytes, "limits.max_document_bytes")?;
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref root_dir) = self.content.root_dir {
            self.content.root_dir = Some(expand::expand_env(root_dir, "content.root_dir")?);
        }
        Ok(())
    }

    /// Resolve the content root against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let root_dir = self.content.root_dir.as_deref().unwrap_or(DEFAULT_ROOT_DIR);
        self.content_resolved = ContentConfig {
            root_dir: config_dir.join(root_dir),
        };
    }
}
