//! Emby Monitor
//!
//! Polls an Emby media server on a fixed interval and publishes a typed,
//! change-detected view of it: server health, library counts, and what each
//! monitored device is playing.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use emby_monitor::{EmbyMonitor, MonitorConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MonitorConfig::builder("192.168.1.20", "api-key")
//!     .with_devices(["living-room-tv"])
//!     .build()?;
//!
//! let monitor = EmbyMonitor::new(config)?;
//! monitor.test_connection().await?;
//!
//! let mut changes = monitor.changes();
//! let handle = monitor.start()?;
//!
//! while let Ok(change) = changes.recv().await {
//!     println!("{} = {}", change.key, change.value);
//! }
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
mod monitor;

pub use config::{
    ConfigError, MonitorConfig, MonitorConfigBuilder, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL,
};
pub use error::{MonitorError, Result};
pub use monitor::{CycleOutcome, EmbyMonitor, MonitorStats, PollingHandle};

// Re-export the types consumers need without depending on the inner crates
pub use emby_client::{ConnectionConfig, FetchError, FetchErrorKind, QueryKind};
pub use emby_state::{
    ChangeEvent, ChangeKind, DerivedState, DeviceFilter, DeviceId, DeviceState, EntityKey,
    EntityValue, PlayState, ServerInfo, Snapshot,
};
