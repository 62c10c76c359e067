//! Error types for discovery backends

use thiserror::Error;

/// Discovery error types
///
/// Activation outcomes ("not selected", "selected but misconfigured") are never
/// reported through this type; they resolve to `Ok(false)` / `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// The settings object handed over by the host is malformed
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Missing setting: [{0}]")]
    MissingSetting(String),

    #[error("Invalid setting [{key}]: {reason}")]
    InvalidSetting { key: String, reason: String },

    /// The host broke a contract this component relies on
    #[error("Host contract violation: {0}")]
    HostContract(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Registry client is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for discovery operations
pub type Result<T> = std::result::Result<T, Error>;
