//! Immutable result of one polling tick

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use emby_client::{FetchError, FetchErrorKind, QueryKind};

use crate::model::{
    ActivitySummary, Device, LibraryCounts, NetworkEndpoint, ServerInfo, Session, User,
};

/// Default number of consecutive system-info failures before the server
/// counts as offline
pub const DEFAULT_OFFLINE_THRESHOLD: u32 = 1;

/// The queries that failed on a tick, keyed by query kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSet(BTreeMap<QueryKind, FetchError>);

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, error: FetchError) {
        self.0.insert(error.query, error);
    }

    pub fn get(&self, query: QueryKind) -> Option<&FetchError> {
        self.0.get(&query)
    }

    pub fn contains(&self, query: QueryKind) -> bool {
        self.0.contains_key(&query)
    }

    /// Failure kind of `query`, if it failed
    pub fn kind_of(&self, query: QueryKind) -> Option<FetchErrorKind> {
        self.0.get(&query).map(|e| e.kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Every query of the tick failed
    pub fn is_total_failure(&self) -> bool {
        QueryKind::ALL.iter().all(|q| self.0.contains_key(q))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FetchError> {
        self.0.values()
    }
}

impl FromIterator<FetchError> for ErrorSet {
    fn from_iter<I: IntoIterator<Item = FetchError>>(iter: I) -> Self {
        let mut set = ErrorSet::new();
        for error in iter {
            set.insert(error);
        }
        set
    }
}

/// Aggregated server state for one tick
///
/// Fields whose query failed on this tick hold the last successfully fetched
/// value; `errors` records which ones. `server` stays `None` until system info
/// has been fetched at least once.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub server: Option<ServerInfo>,
    pub endpoint: Option<NetworkEndpoint>,
    pub library: LibraryCounts,
    /// Ordered by device id, then session id
    pub sessions: Vec<Session>,
    /// Ordered by device id
    pub devices: Vec<Device>,
    pub users: Vec<User>,
    pub activity: ActivitySummary,
    pub errors: ErrorSet,
    /// Consecutive ticks on which system info failed, this one included
    pub system_info_failures: u32,
    pub offline_threshold: u32,
}

impl Snapshot {
    /// An empty snapshot: nothing fetched, nothing failed
    pub fn empty(fetched_at: DateTime<Utc>, offline_threshold: u32) -> Self {
        Self {
            fetched_at,
            server: None,
            endpoint: None,
            library: LibraryCounts::default(),
            sessions: Vec::new(),
            devices: Vec::new(),
            users: Vec::new(),
            activity: ActivitySummary::default(),
            errors: ErrorSet::new(),
            system_info_failures: 0,
            offline_threshold,
        }
    }

    /// Whether the server should be reported offline
    ///
    /// Offline once the failure streak reaches the threshold, or while system
    /// info has never been fetched.
    pub fn is_offline(&self) -> bool {
        self.server.is_none() || self.system_info_failures >= self.offline_threshold.max(1)
    }

    /// Sessions with something loaded
    pub fn active_sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter().filter(|s| s.is_active())
    }
}
