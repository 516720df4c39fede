//! Concurrent fan-out of upstream queries into one [`Snapshot`]
//!
//! The aggregator fires every query kind once per tick, joins them, and
//! merges the results with its last-known-good cache: a query that fails
//! leaves the previous value of its field in place and is recorded in the
//! snapshot's error set. Aggregation itself never fails.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use emby_client::{FetchError, FetchErrorKind, QueryKind, UpstreamApi};
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::decode::{decode_payload, QueryPayload};
use crate::model::{
    ActivityEntry, ActivitySummary, Device, ItemCounts, LibraryCounts, MediaFolder,
    NetworkEndpoint, ScheduledTask, ServerInfo, Session, User,
};
use crate::snapshot::{ErrorSet, Snapshot, DEFAULT_OFFLINE_THRESHOLD};

/// Last successful value of every query
#[derive(Debug, Default)]
struct LastKnownGood {
    server: Option<ServerInfo>,
    pending_restart: bool,
    endpoint: Option<NetworkEndpoint>,
    counts: ItemCounts,
    folders: Vec<MediaFolder>,
    sessions: Vec<Session>,
    users: Vec<User>,
    activity: Vec<ActivityEntry>,
    tasks: Vec<ScheduledTask>,
    devices: Vec<Device>,
    system_info_failures: u32,
    last_fetched_at: Option<DateTime<Utc>>,
}

impl LastKnownGood {
    fn apply(&mut self, payload: QueryPayload) {
        match payload {
            QueryPayload::SystemInfo {
                info,
                pending_restart,
            } => {
                self.server = Some(info);
                self.pending_restart = pending_restart;
            }
            QueryPayload::Endpoint(endpoint) => self.endpoint = Some(endpoint),
            QueryPayload::Counts(counts) => self.counts = counts,
            QueryPayload::Folders(folders) => self.folders = folders,
            QueryPayload::Sessions(sessions) => self.sessions = sessions,
            QueryPayload::Users(users) => self.users = users,
            QueryPayload::Activity(entries) => self.activity = entries,
            QueryPayload::Tasks(tasks) => self.tasks = tasks,
            QueryPayload::Devices(devices) => self.devices = devices,
        }
    }

    /// Next snapshot time, never earlier than the previous one
    fn next_fetched_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let fetched_at = match self.last_fetched_at {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_fetched_at = Some(fetched_at);
        fetched_at
    }
}

/// Builds one snapshot per tick from concurrent upstream queries
pub struct SnapshotAggregator {
    api: Arc<dyn UpstreamApi>,
    offline_threshold: u32,
    cache: Mutex<LastKnownGood>,
}

impl SnapshotAggregator {
    /// Create an aggregator with the default offline threshold
    pub fn new(api: Arc<dyn UpstreamApi>) -> Self {
        Self::with_threshold(api, DEFAULT_OFFLINE_THRESHOLD)
    }

    /// Create an aggregator that reports the server offline after
    /// `offline_threshold` consecutive system-info failures (minimum 1)
    pub fn with_threshold(api: Arc<dyn UpstreamApi>, offline_threshold: u32) -> Self {
        Self {
            api,
            offline_threshold: offline_threshold.max(1),
            cache: Mutex::new(LastKnownGood::default()),
        }
    }

    pub fn offline_threshold(&self) -> u32 {
        self.offline_threshold
    }

    /// Run every query concurrently and merge the results
    pub async fn aggregate(&self) -> Snapshot {
        let fetches = QueryKind::ALL.iter().map(|&query| {
            let api = Arc::clone(&self.api);
            async move {
                let result = api
                    .fetch(query)
                    .await
                    .and_then(|value| decode_payload(query, value));
                (query, result)
            }
        });

        let results = join_all(fetches).await;
        self.merge(results)
    }

    /// Record a tick that ran past its ceiling
    ///
    /// Every query counts as timed out, so the failure streak advances and
    /// all fields are carried over.
    pub fn abandon(&self) -> Snapshot {
        let results = QueryKind::ALL
            .iter()
            .map(|&query| {
                (
                    query,
                    Err(FetchError::timeout(query, "Cycle exceeded its ceiling")),
                )
            })
            .collect();
        self.merge(results)
    }

    fn merge(&self, results: Vec<(QueryKind, Result<QueryPayload, FetchError>)>) -> Snapshot {
        let mut cache = self.cache.lock();
        let mut errors = ErrorSet::new();

        for (query, result) in results {
            match result {
                Ok(payload) => {
                    debug!(query = %query, "Query succeeded");
                    cache.apply(payload);
                }
                Err(err) => {
                    if err.kind == FetchErrorKind::AuthFailed {
                        error!(query = %query, "Emby rejected the API key: {}", err);
                    } else {
                        warn!(query = %query, kind = %err.kind, "Query failed, keeping last known value: {}", err.message);
                    }
                    errors.insert(err);
                }
            }
        }

        if errors.contains(QueryKind::SystemInfo) {
            cache.system_info_failures = cache.system_info_failures.saturating_add(1);
        } else {
            cache.system_info_failures = 0;
        }

        let fetched_at = cache.next_fetched_at();
        let activity =
            ActivitySummary::build(cache.pending_restart, &cache.tasks, &cache.activity, fetched_at);
        let library = LibraryCounts::new(
            cache.counts,
            cache.folders.len() as u64,
            activity.recent_additions.len() as u64,
        );

        debug!(
            failed = errors.len(),
            system_info_failures = cache.system_info_failures,
            "Snapshot built"
        );

        Snapshot {
            fetched_at,
            server: cache.server.clone(),
            endpoint: cache.endpoint,
            library,
            sessions: cache.sessions.clone(),
            devices: cache.devices.clone(),
            users: cache.users.clone(),
            activity,
            errors,
            system_info_failures: cache.system_info_failures,
            offline_threshold: self.offline_threshold,
        }
    }
}

impl std::fmt::Debug for SnapshotAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotAggregator")
            .field("offline_threshold", &self.offline_threshold)
            .finish_non_exhaustive()
    }
}
