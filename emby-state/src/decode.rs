//! Decoding raw query bodies into domain payloads
//!
//! Each query kind decodes into its own [`QueryPayload`] variant. Entries that
//! lack the identity they need (a session without an id, a device without any
//! id) are dropped rather than invented.

use chrono::{DateTime, NaiveDateTime, Utc};
use emby_client::models::{
    ActivityEntryResponse, DeviceResponse, EndpointResponse, ItemCountsResponse,
    MediaFolderResponse, MediaStreamResponse, QueryResultResponse, ScheduledTaskResponse, SessionResponse,
    SystemInfoResponse, UserResponse,
};
use emby_client::{decode, FetchError, QueryKind};
use serde_json::Value;
use tracing::debug;

use crate::model::{
    ActivityEntry, Device, DeviceId, ItemCounts, MediaFolder, MediaKind, MediaStream,
    NetworkEndpoint, NowPlayingItem, PlayState, ScheduledTask, ServerInfo, Session, SessionId,
    StreamKind, User,
};

/// The decoded result of one query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPayload {
    SystemInfo {
        info: ServerInfo,
        pending_restart: bool,
    },
    Endpoint(NetworkEndpoint),
    Counts(ItemCounts),
    Folders(Vec<MediaFolder>),
    Sessions(Vec<Session>),
    Users(Vec<User>),
    Activity(Vec<ActivityEntry>),
    Tasks(Vec<ScheduledTask>),
    Devices(Vec<Device>),
}

/// Decode the body of `query` into its payload
pub fn decode_payload(query: QueryKind, value: Value) -> Result<QueryPayload, FetchError> {
    let payload = match query {
        QueryKind::SystemInfo => {
            let raw: SystemInfoResponse = decode(query, value)?;
            QueryPayload::SystemInfo {
                pending_restart: raw.has_pending_restart,
                info: ServerInfo {
                    name: raw.server_name,
                    version: raw.version,
                    operating_system: raw.operating_system,
                    id: raw.id,
                },
            }
        }
        QueryKind::SystemEndpoint => {
            let raw: EndpointResponse = decode(query, value)?;
            QueryPayload::Endpoint(NetworkEndpoint {
                is_local: raw.is_local,
                is_in_network: raw.is_in_network,
            })
        }
        QueryKind::LibraryCounts => {
            let raw: ItemCountsResponse = decode(query, value)?;
            QueryPayload::Counts(ItemCounts {
                movie_count: raw.movie_count,
                series_count: raw.series_count,
                episode_count: raw.episode_count,
                song_count: raw.song_count,
                album_count: raw.album_count,
                artist_count: raw.artist_count,
            })
        }
        QueryKind::LibraryFolders => {
            let raw: QueryResultResponse<MediaFolderResponse> = decode(query, value)?;
            QueryPayload::Folders(
                raw.items
                    .into_iter()
                    .map(|f| MediaFolder {
                        id: f.id,
                        name: f.name.unwrap_or_default(),
                        collection_type: f.collection_type,
                    })
                    .collect(),
            )
        }
        QueryKind::Sessions => {
            let raw: Vec<SessionResponse> = decode(query, value)?;
            let mut sessions: Vec<Session> = raw.into_iter().filter_map(session_from).collect();
            sessions.sort_by(|a, b| {
                (&a.device_id, &a.session_id).cmp(&(&b.device_id, &b.session_id))
            });
            QueryPayload::Sessions(sessions)
        }
        QueryKind::Users => {
            let raw: Vec<UserResponse> = decode(query, value)?;
            QueryPayload::Users(
                raw.into_iter()
                    .filter_map(|u| {
                        Some(User {
                            id: u.id?,
                            name: u.name,
                        })
                    })
                    .collect(),
            )
        }
        QueryKind::ActivityLog => {
            let raw: QueryResultResponse<ActivityEntryResponse> = decode(query, value)?;
            QueryPayload::Activity(
                raw.items
                    .into_iter()
                    .map(|e| ActivityEntry {
                        name: e.name.unwrap_or_else(|| "Unknown".to_string()),
                        entry_type: e.entry_type.unwrap_or_default(),
                        date: e.date.as_deref().and_then(parse_timestamp),
                        severity: e.severity,
                    })
                    .collect(),
            )
        }
        QueryKind::ScheduledTasks => {
            let raw: Vec<ScheduledTaskResponse> = decode(query, value)?;
            QueryPayload::Tasks(
                raw.into_iter()
                    .map(|t| ScheduledTask {
                        name: t.name.unwrap_or_default(),
                        state: t.state.unwrap_or_default(),
                        category: t.category,
                        progress_percent: t.current_progress_percentage,
                    })
                    .collect(),
            )
        }
        QueryKind::Devices => {
            let raw: QueryResultResponse<DeviceResponse> = decode(query, value)?;
            let mut devices: Vec<Device> = raw.items.into_iter().filter_map(device_from).collect();
            devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
            QueryPayload::Devices(devices)
        }
    };
    Ok(payload)
}

fn session_from(raw: SessionResponse) -> Option<Session> {
    let Some(id) = raw.id.filter(|id| !id.is_empty()) else {
        debug!("Dropping session without an id");
        return None;
    };

    let is_paused = raw.play_state.as_ref().map(|p| p.is_paused).unwrap_or(false);
    let is_muted = raw.play_state.as_ref().map(|p| p.is_muted).unwrap_or(false);
    let position_ticks = raw.play_state.as_ref().and_then(|p| p.position_ticks);
    let audio_stream_index = raw.play_state.as_ref().and_then(|p| p.audio_stream_index);
    let subtitle_stream_index = raw.play_state.as_ref().and_then(|p| p.subtitle_stream_index);

    let now_playing = raw.now_playing_item.map(|item| NowPlayingItem {
        title: item.name,
        media_kind: MediaKind::from_item_type(item.item_type.as_deref().unwrap_or("")),
        runtime_ticks: item.run_time_ticks,
        position_ticks,
        series_name: item.series_name,
        season: item.parent_index_number,
        episode: item.index_number,
        production_year: item.production_year,
        streams: item.media_streams.into_iter().map(stream_from).collect(),
        audio_stream_index,
        subtitle_stream_index,
    });

    Some(Session {
        session_id: SessionId::new(id),
        device_id: raw.device_id.filter(|d| !d.trim().is_empty()).map(DeviceId::new),
        internal_device_id: raw.internal_device_id.as_ref().and_then(id_string),
        device_name: raw.device_name,
        user_id: raw.user_id,
        user_name: raw.user_name,
        client: raw.client,
        play_state: PlayState::from_session(now_playing.is_some(), is_paused),
        now_playing,
        is_muted,
    })
}

fn stream_from(raw: MediaStreamResponse) -> MediaStream {
    MediaStream {
        index: raw.index,
        kind: StreamKind::from_stream_type(raw.stream_type.as_deref().unwrap_or("")),
        language: raw.display_language.or(raw.language),
        title: raw.display_title,
        codec: raw.codec,
        channels: raw.channels,
        channel_layout: raw.channel_layout,
        is_default: raw.is_default,
        is_forced: raw.is_forced,
    }
}

fn device_from(raw: DeviceResponse) -> Option<Device> {
    let internal = raw
        .id
        .clone()
        .or_else(|| raw.internal_id.as_ref().and_then(id_string));
    let reported = raw.reported_device_id.filter(|r| !r.trim().is_empty());

    let (device_id, internal_id) = match (reported, internal) {
        (Some(reported), internal) => {
            let internal = internal.filter(|i| *i != reported);
            (DeviceId::new(reported), internal)
        }
        (None, Some(internal)) => (DeviceId::new(internal), None),
        (None, None) => {
            debug!("Dropping device without an id");
            return None;
        }
    };

    Some(Device {
        device_id,
        internal_id,
        device_name: raw.name,
        last_seen_at: raw.date_last_activity.as_deref().and_then(parse_timestamp),
        app_name: raw.app_name,
        last_user_name: raw.last_user_name,
    })
}

/// Ids arrive as numbers on some servers and strings on others
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse an Emby timestamp
///
/// Emby writes RFC 3339 with seven fractional digits; offset-less values are
/// taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
