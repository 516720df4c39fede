//! Logical queries against the Emby API
//!
//! Each `QueryKind` maps to exactly one HTTP endpoint. The aggregator fires
//! every kind in [`QueryKind::ALL`] once per polling tick.

use std::fmt;

use serde::Serialize;

/// Default number of activity log entries requested per tick
pub const DEFAULT_ACTIVITY_LIMIT: u32 = 50;

/// One logical upstream query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum QueryKind {
    /// `/System/Info` - server identity, version and restart flag
    SystemInfo,
    /// `/System/Endpoint` - whether this client is inside the server's network
    SystemEndpoint,
    /// `/Items/Counts` - per media type item counts
    LibraryCounts,
    /// `/Library/MediaFolders` - configured libraries
    LibraryFolders,
    /// `/Sessions` - active playback contexts
    Sessions,
    /// `/Users`
    Users,
    /// `/System/ActivityLog/Entries` - recent server activity
    ActivityLog,
    /// `/ScheduledTasks`
    ScheduledTasks,
    /// `/Devices` - known client devices
    Devices,
}

impl QueryKind {
    /// Every query issued on a polling tick, in a stable order
    pub const ALL: [QueryKind; 9] = [
        QueryKind::SystemInfo,
        QueryKind::SystemEndpoint,
        QueryKind::LibraryCounts,
        QueryKind::LibraryFolders,
        QueryKind::Sessions,
        QueryKind::Users,
        QueryKind::ActivityLog,
        QueryKind::ScheduledTasks,
        QueryKind::Devices,
    ];

    /// API path relative to the server base URL
    pub fn endpoint(&self) -> &'static str {
        match self {
            QueryKind::SystemInfo => "/System/Info",
            QueryKind::SystemEndpoint => "/System/Endpoint",
            QueryKind::LibraryCounts => "/Items/Counts",
            QueryKind::LibraryFolders => "/Library/MediaFolders",
            QueryKind::Sessions => "/Sessions",
            QueryKind::Users => "/Users",
            QueryKind::ActivityLog => "/System/ActivityLog/Entries",
            QueryKind::ScheduledTasks => "/ScheduledTasks",
            QueryKind::Devices => "/Devices",
        }
    }

    /// Short stable name used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::SystemInfo => "system-info",
            QueryKind::SystemEndpoint => "system-endpoint",
            QueryKind::LibraryCounts => "library-counts",
            QueryKind::LibraryFolders => "library-folders",
            QueryKind::Sessions => "sessions",
            QueryKind::Users => "users",
            QueryKind::ActivityLog => "activity-log",
            QueryKind::ScheduledTasks => "scheduled-tasks",
            QueryKind::Devices => "devices",
        }
    }

    /// Query string parameters for this endpoint
    pub fn params(&self, activity_limit: u32) -> Vec<(&'static str, String)> {
        match self {
            QueryKind::ActivityLog => vec![("Limit", activity_limit.to_string())],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
