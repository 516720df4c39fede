//! Error types for emby-state

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for emby-state operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors raised while publishing derived state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Another publication cycle holds the guard
    #[error("A publication cycle is already in progress")]
    PublishInProgress,

    /// The candidate state predates the published one
    #[error("Derived state from {candidate} is older than published state from {published}")]
    StaleState {
        candidate: DateTime<Utc>,
        published: DateTime<Utc>,
    },
}
