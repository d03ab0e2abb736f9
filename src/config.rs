use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found at {config_path}")]
    NotFound { config_path: PathBuf },

    #[error("Failed to read config file at {config_path}: {source}")]
    Read {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    Parse {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    pub citations: CitationConfig,
    pub faithfulness: FaithfulnessConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub theme: Theme,
    pub show_sources: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            show_sources: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CitationConfig {
    pub preview_chars: usize,
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self { preview_chars: 200 }
    }
}

/// Score cut-offs for [`crate::FaithfulnessBand`]
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FaithfulnessConfig {
    pub high: f64,
    pub medium: f64,
}

impl Default for FaithfulnessConfig {
    fn default() -> Self {
        Self {
            high: 0.7,
            medium: 0.5,
        }
    }
}

impl Config {
    /// The config bundled into the binary (validated by build.rs).
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load config from a TOML file, or return the compiled default if the
    /// file does not exist. Keys missing from the file keep their defaults.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::compiled_default());
        }

        Self::read(config_path)
    }

    /// Load a config file the user named explicitly. Unlike [`Config::load`],
    /// a missing file is an error.
    pub fn load_existing(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::NotFound {
                config_path: config_path.to_path_buf(),
            });
        }

        Self::read(config_path)
    }

    fn read(config_path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            config_path: config_path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            config_path: config_path.to_path_buf(),
            source,
        })
    }
}
