//! Pure derivation of published state from a snapshot
//!
//! [`derive`] is total and deterministic: the same snapshot and filter always
//! produce the same [`DerivedState`]. It reads nothing but its arguments.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use emby_client::{FetchErrorKind, QueryKind};
use serde::Serialize;

use crate::filter::DeviceFilter;
use crate::model::{Device, DeviceId, LibraryCounts, MediaKind, NowPlayingItem, PlayState, Session};
use crate::snapshot::Snapshot;

/// Label of a device with nothing playing
pub const IDLE_LABEL: &str = "Idle";

/// Label of an item the server sent without a name
const UNKNOWN_TITLE: &str = "Unknown";

/// Now-playing facts for one monitored device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    pub device_name: Option<String>,
    pub user_name: Option<String>,
    pub playback_state: PlayState,
    pub now_playing_label: String,
    pub media_kind: Option<MediaKind>,
    pub progress_percent: Option<u8>,
    pub position: Option<Duration>,
    pub remaining_time: Option<Duration>,
    pub audio_track: Option<String>,
    pub subtitle_track: Option<String>,
    /// `None` while nothing plays
    pub is_muted: Option<bool>,
}

impl DeviceState {
    fn idle(device_name: Option<String>, user_name: Option<String>) -> Self {
        Self {
            device_name,
            user_name,
            playback_state: PlayState::Idle,
            now_playing_label: IDLE_LABEL.to_string(),
            media_kind: None,
            progress_percent: None,
            position: None,
            remaining_time: None,
            audio_track: None,
            subtitle_track: None,
            is_muted: None,
        }
    }
}

/// Normalized facts published downstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedState {
    pub fetched_at: DateTime<Utc>,
    pub server_online: bool,
    pub has_active_playback: bool,
    pub pending_restart: bool,
    pub network_connected: bool,
    pub server_name: Option<String>,
    pub server_version: Option<String>,
    /// `None` until the endpoint query has succeeded once
    pub is_in_network: Option<bool>,
    pub tasks_running: bool,
    pub library_scanning: bool,
    /// Scheduled tasks known to the server
    pub task_count: usize,
    /// Entries in the last activity log response
    pub activity_count: usize,
    /// Playbacks logged on the UTC day of `fetched_at`
    pub today_play_count: u64,
    /// Estimate derived from `today_play_count`
    pub today_watch_time: Duration,
    pub library: LibraryCounts,
    pub latest_addition: Option<String>,
    /// Monitored sessions with something loaded
    pub active_session_count: usize,
    pub device_count: usize,
    pub user_count: usize,
    pub devices: BTreeMap<DeviceId, DeviceState>,
}

/// Derive published state from a filtered snapshot
pub fn derive(snapshot: &Snapshot, filter: &DeviceFilter) -> DerivedState {
    let server = snapshot.server.as_ref();
    let system_info_unreachable =
        snapshot.errors.kind_of(QueryKind::SystemInfo) == Some(FetchErrorKind::Unreachable);

    let sessions: Vec<&Session> = snapshot
        .sessions
        .iter()
        .filter(|s| filter.matches_session(s))
        .collect();
    let devices: Vec<&Device> = snapshot
        .devices
        .iter()
        .filter(|d| filter.matches_device(d))
        .collect();

    DerivedState {
        fetched_at: snapshot.fetched_at,
        server_online: !snapshot.is_offline(),
        has_active_playback: sessions.iter().any(|s| s.play_state == PlayState::Playing),
        pending_restart: snapshot.activity.pending_restart,
        network_connected: !system_info_unreachable,
        server_name: server.and_then(|s| s.name.clone()),
        server_version: server.and_then(|s| s.version.clone()),
        is_in_network: snapshot.endpoint.map(|e| e.is_in_network),
        tasks_running: snapshot.activity.tasks_running(),
        library_scanning: snapshot.activity.library_scanning,
        task_count: snapshot.activity.task_count,
        activity_count: snapshot.activity.entry_count,
        today_play_count: snapshot.activity.today_play_count,
        today_watch_time: snapshot.activity.today_watch_time_estimate(),
        library: snapshot.library,
        latest_addition: snapshot.activity.latest_addition().map(str::to_string),
        active_session_count: sessions.iter().filter(|s| s.is_active()).count(),
        device_count: devices.len(),
        user_count: snapshot.users.len(),
        devices: device_states(filter, &sessions, &devices),
    }
}

/// One entry per configured id, or per known device when monitoring all
fn device_states(
    filter: &DeviceFilter,
    sessions: &[&Session],
    devices: &[&Device],
) -> BTreeMap<DeviceId, DeviceState> {
    let ids: BTreeSet<DeviceId> = match filter.monitored() {
        Some(ids) => ids.clone(),
        None => devices
            .iter()
            .map(|d| d.device_id.clone())
            .chain(
                sessions
                    .iter()
                    .filter(|s| !devices.iter().any(|d| d.serves_session(s)))
                    .filter_map(|s| s.device_id.clone()),
            )
            .collect(),
    };

    ids.into_iter()
        .map(|id| {
            let device = devices.iter().copied().find(|d| d.has_id(&id));
            let session = best_session(sessions.iter().copied().filter(|s| {
                s.is_on_device(&id) || device.is_some_and(|d| d.serves_session(s))
            }));
            let state = device_state(session, device);
            (id, state)
        })
        .collect()
}

/// Prefer a playing session, then a paused one, then any
fn best_session<'a>(candidates: impl Iterator<Item = &'a Session>) -> Option<&'a Session> {
    candidates.min_by_key(|s| match s.play_state {
        PlayState::Playing => 0,
        PlayState::Paused => 1,
        PlayState::Idle => 2,
    })
}

fn device_state(session: Option<&Session>, device: Option<&Device>) -> DeviceState {
    let device_name = session
        .and_then(|s| s.device_name.clone())
        .or_else(|| device.and_then(|d| d.device_name.clone()));
    let user_name = session
        .and_then(|s| s.user_name.clone())
        .or_else(|| device.and_then(|d| d.last_user_name.clone()));

    let Some((session, item)) = session.and_then(|s| s.now_playing.as_ref().map(|i| (s, i)))
    else {
        return DeviceState::idle(device_name, user_name);
    };

    DeviceState {
        device_name,
        user_name,
        playback_state: session.play_state,
        now_playing_label: now_playing_label(item),
        media_kind: Some(item.media_kind.clone()),
        progress_percent: item.progress_percent(),
        position: Some(item.position()),
        remaining_time: item.remaining_time(),
        audio_track: Some(item.audio_track()),
        subtitle_track: Some(item.subtitle_track()),
        is_muted: Some(session.is_muted),
    }
}

/// Human-readable label of a playing item
///
/// Episodes read "Series — S01E02 — Title", movies "Title (2010)", anything
/// else just its title.
pub fn now_playing_label(item: &NowPlayingItem) -> String {
    let title = item.title.as_deref().filter(|t| !t.is_empty());

    match item.media_kind {
        MediaKind::Episode if item.series_name.is_some() => {
            let mut parts: Vec<String> = Vec::with_capacity(3);
            if let Some(series) = &item.series_name {
                parts.push(series.clone());
            }
            if let (Some(season), Some(episode)) = (item.season, item.episode) {
                parts.push(format!("S{:02}E{:02}", season, episode));
            }
            if let Some(title) = title {
                parts.push(title.to_string());
            }
            parts.join(" — ")
        }
        MediaKind::Movie => {
            let title = title.unwrap_or(UNKNOWN_TITLE);
            match item.production_year {
                Some(year) => format!("{} ({})", title, year),
                None => title.to_string(),
            }
        }
        _ => title.unwrap_or(UNKNOWN_TITLE).to_string(),
    }
}

/// Format a duration as `HH:MM:SS`, or `MM:SS` under an hour
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
