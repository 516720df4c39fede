//! The periodic driver
//!
//! [`EmbyMonitor`] runs the tick pipeline (aggregate, filter, derive,
//! publish) on a fixed interval, bounded by the cycle ceiling. Manual
//! refreshes share the same publication guard, so cycles never overlap: a
//! tick that arrives while another cycle is publishing is skipped.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use emby_client::{EmbyClient, FetchError, QueryKind, UpstreamApi};
use emby_state::decode::{decode_payload, QueryPayload};
use futures::FutureExt;
use emby_state::{
    derive, ChangeEvent, DerivedState, ServerInfo, Snapshot, SnapshotAggregator, StateError,
    TransitionPublisher,
};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};

/// What happened to one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// State was derived and published
    Published {
        changes: usize,
        failed_queries: usize,
    },
    /// The cycle ran past its ceiling and was published as a total failure
    Abandoned { changes: usize },
    /// Another cycle held the publication guard
    Skipped,
    /// The publisher refused the derived state
    Rejected(StateError),
}

/// Counters over the monitor's lifetime
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorStats {
    pub cycles: u64,
    pub published: u64,
    pub abandoned: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub events_emitted: u64,
    /// Cycles in a row with at least one failed query
    pub consecutive_degraded: u32,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_cycle_duration: Option<Duration>,
}

impl MonitorStats {
    fn record(&mut self, outcome: &CycleOutcome, started: Instant) {
        match outcome {
            CycleOutcome::Skipped => {
                self.skipped += 1;
                return;
            }
            CycleOutcome::Published {
                changes,
                failed_queries,
            } => {
                self.published += 1;
                self.events_emitted += *changes as u64;
                if *failed_queries > 0 {
                    self.consecutive_degraded += 1;
                } else {
                    self.consecutive_degraded = 0;
                }
            }
            CycleOutcome::Abandoned { changes } => {
                self.abandoned += 1;
                self.events_emitted += *changes as u64;
                self.consecutive_degraded += 1;
            }
            CycleOutcome::Rejected(_) => self.rejected += 1,
        }
        self.cycles += 1;
        self.last_cycle_at = Some(Utc::now());
        self.last_cycle_duration = Some(started.elapsed());
    }
}

impl fmt::Display for MonitorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Monitor Stats:")?;
        writeln!(f, "  Cycles: {}", self.cycles)?;
        writeln!(f, "  Published: {}", self.published)?;
        writeln!(f, "  Abandoned: {}", self.abandoned)?;
        writeln!(f, "  Skipped: {}", self.skipped)?;
        writeln!(f, "  Rejected: {}", self.rejected)?;
        writeln!(f, "  Events emitted: {}", self.events_emitted)?;
        writeln!(f, "  Consecutive degraded cycles: {}", self.consecutive_degraded)?;
        if let Some(duration) = self.last_cycle_duration {
            write!(f, "  Last cycle took: {:?}", duration)?;
        }
        Ok(())
    }
}

struct Inner {
    config: MonitorConfig,
    api: Arc<dyn UpstreamApi>,
    aggregator: SnapshotAggregator,
    publisher: TransitionPublisher,
    last_snapshot: Mutex<Option<Arc<Snapshot>>>,
    stats: Mutex<MonitorStats>,
    refresh: Notify,
    running: AtomicBool,
}

/// Polls one Emby server and publishes its derived state
///
/// Cheap to clone; clones drive the same pipeline.
#[derive(Clone)]
pub struct EmbyMonitor {
    inner: Arc<Inner>,
}

impl EmbyMonitor {
    /// Create a monitor talking HTTP to the configured server
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        let client = EmbyClient::new(&config.client_config())?;
        Self::with_api(config, Arc::new(client))
    }

    /// Create a monitor over any upstream implementation
    pub fn with_api(config: MonitorConfig, api: Arc<dyn UpstreamApi>) -> Result<Self> {
        config.validate()?;

        let aggregator = SnapshotAggregator::with_threshold(api.clone(), config.offline_threshold);
        let publisher = TransitionPublisher::with_capacity(config.event_buffer_size);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                api,
                aggregator,
                publisher,
                last_snapshot: Mutex::new(None),
                stats: Mutex::new(MonitorStats::default()),
                refresh: Notify::new(),
                running: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Run one full cycle now
    pub async fn run_cycle(&self) -> CycleOutcome {
        let inner = &self.inner;
        let started = Instant::now();

        let Some(guard) = inner.publisher.try_begin() else {
            debug!("Previous cycle still publishing, skipping");
            let outcome = CycleOutcome::Skipped;
            inner.stats.lock().record(&outcome, started);
            return outcome;
        };

        let ceiling = inner.config.effective_cycle_ceiling();
        let (snapshot, abandoned) =
            match tokio::time::timeout(ceiling, inner.aggregator.aggregate()).await {
                Ok(snapshot) => (snapshot, false),
                Err(_) => {
                    warn!(ceiling = ?ceiling, "Cycle exceeded its ceiling, treating as total failure");
                    (inner.aggregator.abandon(), true)
                }
            };

        let filter = &inner.config.monitored_devices;
        let state = derive(&filter.apply(&snapshot), filter);
        let failed_queries = snapshot.errors.len();
        *inner.last_snapshot.lock() = Some(Arc::new(snapshot));

        let outcome = match guard.publish(state) {
            Ok(events) if abandoned => CycleOutcome::Abandoned {
                changes: events.len(),
            },
            Ok(events) => CycleOutcome::Published {
                changes: events.len(),
                failed_queries,
            },
            Err(err) => CycleOutcome::Rejected(err),
        };
        drop(guard);

        inner.stats.lock().record(&outcome, started);
        debug!(outcome = ?outcome, elapsed = ?started.elapsed(), "Cycle finished");
        outcome
    }

    /// Force a refresh and wait for it
    ///
    /// Returns [`CycleOutcome::Skipped`] if a cycle is already publishing.
    pub async fn refresh_now(&self) -> CycleOutcome {
        info!("Manual refresh");
        self.run_cycle().await
    }

    /// Ask the polling loop for an extra cycle
    ///
    /// Ignored when the loop is not running. A request that arrives while a
    /// cycle is publishing is counted as skipped and does not run later.
    pub fn request_refresh(&self) {
        if !self.is_running() {
            debug!("Polling loop not running, refresh request ignored");
            return;
        }
        if self.inner.publisher.is_publishing() {
            debug!("Cycle in progress, refresh request skipped");
            self.inner
                .stats
                .lock()
                .record(&CycleOutcome::Skipped, Instant::now());
            return;
        }
        self.inner.refresh.notify_one();
    }

    /// Check that the server answers system info with our key
    ///
    /// Runs only the system-info query and leaves all published state, the
    /// failure streak and the last-known-good cache untouched.
    pub async fn test_connection(&self) -> Result<ServerInfo> {
        let query = QueryKind::SystemInfo;
        let timeout = self.inner.config.effective_query_timeout();

        let value = tokio::time::timeout(timeout, self.inner.api.fetch(query))
            .await
            .map_err(|_| FetchError::timeout(query, "Connection test timed out"))??;

        match decode_payload(query, value)? {
            QueryPayload::SystemInfo { info, .. } if info.name.is_some() => {
                info!(server = ?info.name, version = ?info.version, "Connection test succeeded");
                Ok(info)
            }
            _ => Err(FetchError::malformed(query, "Response carries no server name").into()),
        }
    }

    /// The last published state
    pub fn current_state(&self) -> Option<Arc<DerivedState>> {
        self.inner.publisher.current_state()
    }

    /// Subscribe to change events
    pub fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.publisher.subscribe()
    }

    /// Watch the published state
    pub fn watch_state(&self) -> watch::Receiver<Option<Arc<DerivedState>>> {
        self.inner.publisher.watch()
    }

    /// The snapshot behind the last cycle
    pub fn last_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.last_snapshot.lock().clone()
    }

    pub fn stats(&self) -> MonitorStats {
        self.inner.stats.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Start the polling loop on the current tokio runtime
    ///
    /// The first cycle runs immediately. Only one loop may run per monitor.
    pub fn start(&self) -> Result<PollingHandle> {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            return Err(MonitorError::AlreadyRunning);
        }

        let shutdown_signal = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(Notify::new());

        let monitor = self.clone();
        let task_shutdown_signal = Arc::clone(&shutdown_signal);
        let task_stop = Arc::clone(&stop);

        let task_handle = tokio::spawn(async move {
            monitor.polling_loop(task_shutdown_signal, task_stop).await;
        });

        Ok(PollingHandle {
            task_handle,
            shutdown_signal,
            stop,
            started_at: Utc::now(),
        })
    }

    async fn polling_loop(self, shutdown_signal: Arc<AtomicBool>, stop: Arc<Notify>) {
        let interval = self.inner.config.poll_interval;
        info!(
            interval = ?interval,
            ceiling = ?self.inner.config.effective_cycle_ceiling(),
            "Starting polling loop"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = stop.notified() => break,
                _ = ticker.tick() => {}
                _ = self.inner.refresh.notified() => debug!("Refresh requested"),
            }

            if shutdown_signal.load(Ordering::Acquire) {
                break;
            }

            // A tick and a refresh that land together run one cycle
            let _ = self.inner.refresh.notified().now_or_never();
            self.run_cycle().await;
        }

        self.inner.running.store(false, Ordering::Release);
        info!("Polling loop stopped");
    }
}

impl fmt::Debug for EmbyMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbyMonitor")
            .field("host", &self.inner.config.connection.host)
            .field("poll_interval", &self.inner.config.poll_interval)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Handle to a running polling loop
#[derive(Debug)]
pub struct PollingHandle {
    task_handle: JoinHandle<()>,
    shutdown_signal: Arc<AtomicBool>,
    stop: Arc<Notify>,
    started_at: DateTime<Utc>,
}

impl PollingHandle {
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_running(&self) -> bool {
        !self.task_handle.is_finished()
    }

    /// Stop the loop and wait for the current cycle to finish
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown_signal.store(true, Ordering::Release);
        self.stop.notify_one();

        self.task_handle
            .await
            .map_err(|e| MonitorError::Shutdown(format!("Polling task failed: {}", e)))
    }
}
