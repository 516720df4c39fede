//! Configuration for the monitor
//!
//! [`MonitorConfig`] bundles the connection settings with polling policy.
//! The three time bounds must nest strictly:
//! per-query timeout < cycle ceiling < poll interval, so a cycle can never
//! outlive its own scheduling slot.

use std::time::Duration;

use emby_client::{ClientError, ConnectionConfig, DEFAULT_REQUEST_TIMEOUT};
use emby_state::{DeviceFilter, DEFAULT_OFFLINE_THRESHOLD};
use thiserror::Error;

/// Default time between polling ticks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Shortest accepted poll interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default change event buffer per subscriber
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

/// Invalid monitor configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Poll interval must be at least {min:?}, got {actual:?}")]
    IntervalTooShort { min: Duration, actual: Duration },

    #[error(
        "Timeouts must satisfy query timeout < cycle ceiling < poll interval, \
         got {query:?} / {ceiling:?} / {interval:?}"
    )]
    TimeoutOrdering {
        query: Duration,
        ceiling: Duration,
        interval: Duration,
    },

    #[error("Offline threshold must be at least 1")]
    InvalidThreshold,

    #[error("Event buffer size must be greater than 0")]
    InvalidBufferSize,

    #[error(transparent)]
    Connection(#[from] ClientError),
}

/// Settings for one monitored Emby server
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Where and how to connect; `request_timeout` is replaced by
    /// [`MonitorConfig::query_timeout`]
    pub connection: ConnectionConfig,

    /// Devices that get per-device state
    /// Default: all
    pub monitored_devices: DeviceFilter,

    /// Time between polling ticks
    /// Default: 30 seconds
    pub poll_interval: Duration,

    /// Timeout for a single upstream query
    /// Default: the smaller of 10 seconds and half the poll interval
    pub query_timeout: Option<Duration>,

    /// Hard limit for one whole cycle
    /// Default: three quarters of the poll interval
    pub cycle_ceiling: Option<Duration>,

    /// Consecutive system-info failures before the server is reported offline
    /// Default: 1
    pub offline_threshold: u32,

    /// Change events buffered per subscriber
    /// Default: 256
    pub event_buffer_size: usize,
}

impl MonitorConfig {
    /// Create a config for `host` with default polling policy
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            connection: ConnectionConfig::new(host, api_key),
            monitored_devices: DeviceFilter::All,
            poll_interval: DEFAULT_POLL_INTERVAL,
            query_timeout: None,
            cycle_ceiling: None,
            offline_threshold: DEFAULT_OFFLINE_THRESHOLD,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }

    pub fn builder(host: impl Into<String>, api_key: impl Into<String>) -> MonitorConfigBuilder {
        MonitorConfigBuilder::new(host, api_key)
    }

    pub fn effective_query_timeout(&self) -> Duration {
        self.query_timeout
            .unwrap_or_else(|| DEFAULT_REQUEST_TIMEOUT.min(self.poll_interval / 2))
    }

    pub fn effective_cycle_ceiling(&self) -> Duration {
        self.cycle_ceiling
            .unwrap_or_else(|| self.poll_interval.mul_f64(0.75))
    }

    /// Connection settings with the effective query timeout applied
    pub fn client_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            request_timeout: self.effective_query_timeout(),
            ..self.connection.clone()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(ConfigError::IntervalTooShort {
                min: MIN_POLL_INTERVAL,
                actual: self.poll_interval,
            });
        }

        let query = self.effective_query_timeout();
        let ceiling = self.effective_cycle_ceiling();
        if query.is_zero() || query >= ceiling || ceiling >= self.poll_interval {
            return Err(ConfigError::TimeoutOrdering {
                query,
                ceiling,
                interval: self.poll_interval,
            });
        }

        if self.offline_threshold == 0 {
            return Err(ConfigError::InvalidThreshold);
        }

        if self.event_buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize);
        }

        self.client_config().validate()?;
        Ok(())
    }
}

/// Fluent builder for [`MonitorConfig`]
///
/// `build()` validates the result.
///
/// ```rust
/// use std::time::Duration;
/// use emby_monitor::MonitorConfig;
///
/// let config = MonitorConfig::builder("192.168.1.20", "api-key")
///     .with_devices(["living-room-tv"])
///     .with_poll_interval(Duration::from_secs(15))
///     .with_offline_threshold(3)
///     .build()
///     .unwrap();
/// assert_eq!(config.effective_query_timeout(), Duration::from_millis(7500));
/// ```
#[derive(Debug, Clone)]
pub struct MonitorConfigBuilder {
    config: MonitorConfig,
}

impl MonitorConfigBuilder {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            config: MonitorConfig::new(host, api_key),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.connection.port = port;
        self
    }

    /// Connect over HTTPS
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.config.connection.use_tls = use_tls;
        self
    }

    /// Accept self-signed certificates over HTTPS (on by default)
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.connection.accept_invalid_certs = accept;
        self
    }

    /// Monitor only these device ids; `"all"` or no ids monitors every device
    pub fn with_devices<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.monitored_devices = DeviceFilter::from_ids(ids);
        self
    }

    pub fn with_device_filter(mut self, filter: DeviceFilter) -> Self {
        self.config.monitored_devices = filter;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.config.query_timeout = Some(timeout);
        self
    }

    pub fn with_cycle_ceiling(mut self, ceiling: Duration) -> Self {
        self.config.cycle_ceiling = Some(ceiling);
        self
    }

    pub fn with_offline_threshold(mut self, threshold: u32) -> Self {
        self.config.offline_threshold = threshold;
        self
    }

    /// Number of activity log entries fetched per tick
    pub fn with_activity_limit(mut self, limit: u32) -> Self {
        self.config.connection.activity_limit = limit;
        self
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.config.event_buffer_size = size;
        self
    }

    pub fn build(self) -> Result<MonitorConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
