//! Application configuration management.
//!
//! Handles loading, saving, and accessing configuration for the phonebook
//! layer: logging options, manager behaviour, and the shape of the simulated
//! card used by the CLI. Configuration is persisted as TOML on disk.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{SbError, SbResult};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Phonebook manager settings.
    #[serde(default)]
    pub phonebook: PhonebookConfig,

    /// Simulated card settings.
    #[serde(default)]
    pub card: CardConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, logging goes to the console only.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output for the file layer.
    #[serde(default)]
    pub json_output: bool,
}

/// Phonebook manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhonebookConfig {
    /// Permit blocking phonebook operations on the completion-dispatch
    /// context. Blocking there deadlocks the bridge, so this stays off
    /// outside of controlled experiments.
    #[serde(default)]
    pub allow_ops_on_dispatch_context: bool,
}

/// Shape of the simulated card the CLI operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardConfig {
    /// Card flavor: "usim" (modern) or "sim" (legacy).
    #[serde(default = "default_card_flavor")]
    pub flavor: String,

    /// Number of abbreviated-dialing record slots.
    #[serde(default = "default_adn_slots")]
    pub adn_slots: usize,

    /// Number of fixed-dialing record slots.
    #[serde(default = "default_fdn_slots")]
    pub fdn_slots: usize,

    /// Secondary-number sub-slots per record.
    #[serde(default = "default_sub_slots")]
    pub anr_slots: usize,

    /// Email sub-slots per record.
    #[serde(default = "default_sub_slots")]
    pub email_slots: usize,

    /// Encoded record length in bytes, reported by capacity queries.
    #[serde(default = "default_record_len")]
    pub record_len: usize,

    /// PIN2 required for fixed-dialing updates.
    #[serde(default = "default_pin2")]
    pub pin2: String,

    /// Artificial completion latency in milliseconds.
    #[serde(default)]
    pub latency_ms: u64,
}

// Default value functions for serde

fn default_log_level() -> String {
    "info".to_string()
}

fn default_card_flavor() -> String {
    "usim".to_string()
}

fn default_adn_slots() -> usize {
    20
}

fn default_fdn_slots() -> usize {
    10
}

fn default_sub_slots() -> usize {
    2
}

fn default_record_len() -> usize {
    34
}

fn default_pin2() -> String {
    "1234".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            phonebook: PhonebookConfig::default(),
            card: CardConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl Default for PhonebookConfig {
    fn default() -> Self {
        Self {
            allow_ops_on_dispatch_context: false,
        }
    }
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            flavor: default_card_flavor(),
            adn_slots: default_adn_slots(),
            fdn_slots: default_fdn_slots(),
            anr_slots: default_sub_slots(),
            email_slots: default_sub_slots(),
            record_len: default_record_len(),
            pin2: default_pin2(),
            latency_ms: 0,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default config file path, falling back
    /// to defaults when no file exists yet.
    pub fn load_default() -> SbResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> SbResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> SbResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| SbError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> SbResult<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| SbError::Config("could not determine config directory".into()))?;
        Ok(base.join("simbook").join("config.toml"))
    }

    /// Get the effective log directory, or None for console-only logging.
    pub fn effective_log_dir(&self) -> Option<PathBuf> {
        if self.logging.directory.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.logging.directory))
        }
    }
}
