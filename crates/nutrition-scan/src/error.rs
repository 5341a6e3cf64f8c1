//! # Scan Error Types
//!
//! Error types for the scanner runtime.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Runtime      │  │     Input               │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  ChannelError   │  │  Validation             │ │
//! │  │  ConfigLoad     │  │  ShuttingDown   │  │                         │ │
//! │  │  ConfigSave     │  │  RuntimeFailed  │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Service failures are not here. They are part of the workflow and end up
//! in the session state, never as an `Err` from the handle.

use nutrition_core::ValidationError;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Runtime error type.
#[derive(Debug, Error)]
pub enum ScanError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid scan configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Input Errors
    // =========================================================================
    /// Manual form rejected before reaching the session.
    #[error("Invalid product form: {0}")]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// The analyzer thread or its runtime could not be started.
    #[error("Runtime failed: {0}")]
    RuntimeFailed(String),

    /// Agent is shutting down or already stopped.
    #[error("Acquisition agent is shutting down")]
    ShuttingDown,

    /// Command channel is momentarily full.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(err: toml::de::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ScanError {
    fn from(err: toml::ser::Error) -> Self {
        ScanError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ScanError {
    /// Returns true if repeating the same call may succeed.
    ///
    /// Only a momentarily full command channel qualifies; everything else
    /// needs a different input or a restarted agent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScanError::ChannelError(_))
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidConfig(_)
                | ScanError::ConfigLoadFailed(_)
                | ScanError::ConfigSaveFailed(_)
        )
    }
}
