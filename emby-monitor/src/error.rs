//! Error types for emby-monitor

use emby_client::{ClientError, FetchError};
use thiserror::Error;

use crate::config::ConfigError;

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors raised by the monitor
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The configuration failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be created
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// The connection test failed
    #[error("Connection test failed: {0}")]
    Connection(#[from] FetchError),

    /// `start()` was called while the polling loop is running
    #[error("Polling loop is already running")]
    AlreadyRunning,

    /// The polling task did not shut down cleanly
    #[error("Shutdown error: {0}")]
    Shutdown(String),
}
