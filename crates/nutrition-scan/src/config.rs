//! # Scan Configuration
//!
//! Configuration management for the scanner runtime.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     NUTRITION_CALL_TIMEOUT_SECS=10                                     │
//! │     NUTRITION_SYMBOLOGIES=ean13,upc_a                                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/nutrition/scan.toml (Linux)                              │
//! │     ~/Library/Application Support/com.feex.nutrition/scan.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     15s call timeout, 64-slot command buffer, every symbology          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scan.toml
//! [pipeline]
//! thread_name = "frame-analyzer"
//!
//! [agent]
//! command_buffer = 64
//! call_timeout_secs = 15
//!
//! [detection]
//! symbologies = ["ean13", "ean8", "upc_a", "upc_e"]  # empty = accept all
//! ```

use nutrition_core::Symbology;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ScanError, ScanResult};

// =============================================================================
// Pipeline Settings
// =============================================================================

/// Frame analysis pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Name of the dedicated analyzer thread (shows up in debuggers and logs).
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_thread_name() -> String {
    "frame-analyzer".to_string()
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            thread_name: default_thread_name(),
        }
    }
}

// =============================================================================
// Agent Settings
// =============================================================================

/// Acquisition agent settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Capacity of the agent's command channel.
    /// Detections that find it full are dropped; intents wait.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,

    /// Upper bound for a single lookup or create call (seconds).
    /// An elapsed call surfaces as an `Exception` state.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

fn default_command_buffer() -> usize {
    64
}

fn default_call_timeout() -> u64 {
    15
}

impl Default for AgentSettings {
    fn default() -> Self {
        AgentSettings {
            command_buffer: default_command_buffer(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

// =============================================================================
// Detection Settings
// =============================================================================

/// Which detections the session accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Accepted symbologies. Empty accepts everything.
    #[serde(default)]
    pub symbologies: Vec<Symbology>,
}

/// Parses a comma-separated symbology list such as `"ean13, upc-a"`.
pub fn parse_symbology_list(input: &str) -> ScanResult<Vec<Symbology>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Symbology>().map_err(ScanError::InvalidConfig))
        .collect()
}

// =============================================================================
// Main Scan Configuration
// =============================================================================

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Frame pipeline settings.
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Acquisition agent settings.
    #[serde(default)]
    pub agent: AgentSettings,

    /// Detection filter.
    #[serde(default)]
    pub detection: DetectionSettings,
}

impl ScanConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scan.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ScanResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scan config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scan config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ScanResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ScanError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Scan config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ScanResult<()> {
        if self.pipeline.thread_name.trim().is_empty() {
            return Err(ScanError::InvalidConfig(
                "thread_name must not be empty".into(),
            ));
        }

        if self.agent.command_buffer == 0 {
            return Err(ScanError::InvalidConfig(
                "command_buffer must be greater than 0".into(),
            ));
        }

        if self.agent.call_timeout_secs == 0 {
            return Err(ScanError::InvalidConfig(
                "call_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(secs) = std::env::var("NUTRITION_CALL_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => {
                    debug!(secs = s, "Overriding call timeout from environment");
                    self.agent.call_timeout_secs = s;
                }
                Err(_) => warn!(value = %secs, "Ignoring invalid NUTRITION_CALL_TIMEOUT_SECS"),
            }
        }

        if let Ok(buffer) = std::env::var("NUTRITION_COMMAND_BUFFER") {
            if let Ok(b) = buffer.parse::<usize>() {
                self.agent.command_buffer = b;
            }
        }

        if let Ok(name) = std::env::var("NUTRITION_ANALYZER_THREAD") {
            self.pipeline.thread_name = name;
        }

        if let Ok(list) = std::env::var("NUTRITION_SYMBOLOGIES") {
            match parse_symbology_list(&list) {
                Ok(symbologies) => {
                    debug!(symbologies = %list, "Overriding symbology filter from environment");
                    self.detection.symbologies = symbologies;
                }
                Err(e) => warn!(error = %e, "Ignoring invalid NUTRITION_SYMBOLOGIES"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "feex", "nutrition")
            .map(|dirs| dirs.config_dir().join("scan.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the per-call timeout.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.agent.call_timeout_secs)
    }

    /// Returns the accepted symbologies (empty = all).
    pub fn symbologies(&self) -> &[Symbology] {
        &self.detection.symbologies
    }
}
