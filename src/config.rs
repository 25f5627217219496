//! Bridge configuration types and defaults.
//!
//! This module defines the options that shape how failures are rendered,
//! logged, and how many generational handles may be live at once. A single
//! configuration is installed process-wide.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default maximum length of a stored failure message in bytes
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 4096;

/// Smallest accepted message limit
pub const MIN_MAX_MESSAGE_BYTES: usize = 16;

/// Default maximum number of live generational handles per type
pub const DEFAULT_MAX_TRACKED_HANDLES: usize = 1 << 20;

/// Configuration for the C boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Log every captured failure through `tracing` (default: true)
    #[serde(default = "default_true")]
    pub log_failures: bool,

    /// Prefix messages with the raising source location (default: true)
    #[serde(default = "default_true")]
    pub include_location: bool,

    /// Maximum stored message length in bytes (default: 4096)
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Maximum live generational handles per type (default: 1Mi)
    #[serde(default = "default_max_tracked_handles")]
    pub max_tracked_handles: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_failures: true,
            include_location: true,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            max_tracked_handles: DEFAULT_MAX_TRACKED_HANDLES,
        }
    }
}

impl BridgeConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable failure logging
    pub fn with_log_failures(mut self, enable: bool) -> Self {
        self.log_failures = enable;
        self
    }

    /// Enable or disable the source location prefix
    pub fn with_include_location(mut self, enable: bool) -> Self {
        self.include_location = enable;
        self
    }

    /// Set the maximum stored message length
    pub fn with_max_message_bytes(mut self, bytes: usize) -> Self {
        self.max_message_bytes = bytes;
        self
    }

    /// Set the maximum number of live generational handles
    pub fn with_max_tracked_handles(mut self, max: usize) -> Self {
        self.max_tracked_handles = max;
        self
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_bytes < MIN_MAX_MESSAGE_BYTES {
            return Err(ConfigError::InvalidValue {
                field: "max_message_bytes".into(),
                reason: format!("must be at least {}", MIN_MAX_MESSAGE_BYTES),
            });
        }

        if self.max_tracked_handles == 0 || self.max_tracked_handles > u32::MAX as usize {
            return Err(ConfigError::InvalidValue {
                field: "max_tracked_handles".into(),
                reason: "must be between 1 and 2^32 - 1".into(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field name
        field: String,
        /// The reason it's invalid
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

static INSTALLED: Lazy<RwLock<BridgeConfig>> = Lazy::new(|| RwLock::new(BridgeConfig::default()));

/// Snapshot of the installed configuration
pub fn current() -> BridgeConfig {
    INSTALLED.read().clone()
}

/// Validate and install a configuration process-wide
///
/// Threads whose error context already exists keep their message policy;
/// configure before spawning worker threads.
pub fn install(config: BridgeConfig) -> Result<(), ConfigError> {
    config.validate()?;
    *INSTALLED.write() = config;
    Ok(())
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_max_message_bytes() -> usize {
    DEFAULT_MAX_MESSAGE_BYTES
}

fn default_max_tracked_handles() -> usize {
    DEFAULT_MAX_TRACKED_HANDLES
}
