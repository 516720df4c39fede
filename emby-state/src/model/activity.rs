//! Server activity: scheduled tasks and the activity log

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Window in which an activity log addition counts as recent
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Activity log types that mark a library addition
const ADDITION_MARKERS: [&str; 3] = ["Added", "Create", "New"];

/// Activity log types that mark a playback
const PLAYBACK_MARKER: &str = "Playback";

/// Assumed length of one playback when estimating watch time
pub const ESTIMATED_MINUTES_PER_PLAYBACK: u64 = 30;

/// Task names that indicate a library scan (English and Chinese servers)
const SCAN_MARKERS: [&str; 4] = ["Library", "Scan", "库", "扫描"];

/// A scheduled server task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub name: String,
    pub state: String,
    pub category: Option<String>,
    pub progress_percent: Option<f64>,
}

impl ScheduledTask {
    pub fn is_running(&self) -> bool {
        self.state == "Running"
    }

    /// Whether this task scans the media library
    pub fn is_library_scan(&self) -> bool {
        SCAN_MARKERS.iter().any(|m| self.name.contains(m))
    }
}

/// One entry of the server activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub name: String,
    pub entry_type: String,
    pub date: Option<DateTime<Utc>>,
    pub severity: Option<String>,
}

impl ActivityEntry {
    pub fn is_addition(&self) -> bool {
        ADDITION_MARKERS.iter().any(|m| self.entry_type.contains(m))
    }

    pub fn is_playback(&self) -> bool {
        self.entry_type.contains(PLAYBACK_MARKER)
    }
}

/// A media addition seen in the activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentAddition {
    pub name: String,
    pub added_at: DateTime<Utc>,
}

/// What the server is busy with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub pending_restart: bool,
    /// Names of running tasks, in server order
    pub running_tasks: Vec<String>,
    pub library_scanning: bool,
    /// Additions within the recent window, newest first
    pub recent_additions: Vec<RecentAddition>,
    /// Entries returned by the activity log query
    pub entry_count: usize,
    /// Scheduled tasks known to the server, running or not
    pub task_count: usize,
    /// Playback entries dated on the same UTC day as `now`
    pub today_play_count: u64,
}

impl ActivitySummary {
    /// Summarize tasks and log entries as of `now`
    ///
    /// Entries without a parseable date are ignored.
    pub fn build(
        pending_restart: bool,
        tasks: &[ScheduledTask],
        entries: &[ActivityEntry],
        now: DateTime<Utc>,
    ) -> Self {
        let running: Vec<&ScheduledTask> = tasks.iter().filter(|t| t.is_running()).collect();
        let library_scanning = running.iter().any(|t| t.is_library_scan());

        let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
        let mut recent_additions: Vec<RecentAddition> = entries
            .iter()
            .filter(|e| e.is_addition())
            .filter_map(|e| match e.date {
                Some(date) if date >= cutoff => Some(RecentAddition {
                    name: e.name.clone(),
                    added_at: date,
                }),
                _ => None,
            })
            .collect();
        // Stable sort keeps log order among equal timestamps
        recent_additions.sort_by(|a, b| b.added_at.cmp(&a.added_at));

        let today = now.date_naive();
        let today_play_count = entries
            .iter()
            .filter(|e| e.is_playback())
            .filter(|e| e.date.is_some_and(|d| d.date_naive() == today))
            .count() as u64;

        Self {
            pending_restart,
            running_tasks: running.iter().map(|t| t.name.clone()).collect(),
            library_scanning,
            recent_additions,
            entry_count: entries.len(),
            task_count: tasks.len(),
            today_play_count,
        }
    }

    /// Rough watch time for today, from the playback count
    pub fn today_watch_time_estimate(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.today_play_count * ESTIMATED_MINUTES_PER_PLAYBACK * 60)
    }

    pub fn tasks_running(&self) -> bool {
        !self.running_tasks.is_empty()
    }

    /// Name of the newest recent addition
    pub fn latest_addition(&self) -> Option<&str> {
        self.recent_additions.first().map(|a| a.name.as_str())
    }
}
