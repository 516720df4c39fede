//! Wire types for Emby API responses
//!
//! Emby answers in PascalCase JSON. Every field is optional or defaulted so
//! that servers of different versions, which add and drop fields freely, still
//! decode. Unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// `/System/Info`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SystemInfoResponse {
    pub server_name: Option<String>,
    pub version: Option<String>,
    pub operating_system: Option<String>,
    pub id: Option<String>,
    pub has_pending_restart: bool,
}

/// `/System/Endpoint`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EndpointResponse {
    pub is_local: bool,
    pub is_in_network: bool,
}

/// `/Items/Counts`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ItemCountsResponse {
    pub movie_count: u64,
    pub series_count: u64,
    pub episode_count: u64,
    pub song_count: u64,
    pub album_count: u64,
    pub artist_count: u64,
}

/// Paged result wrapper used by several endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryResultResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total_record_count: Option<u64>,
}

/// Entry of `/Library/MediaFolders`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MediaFolderResponse {
    pub id: Option<String>,
    pub name: Option<String>,
    pub collection_type: Option<String>,
}

/// Entry of `/Sessions`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SessionResponse {
    pub id: Option<String>,
    pub device_id: Option<String>,
    /// Numeric on most servers, string on some; kept raw and normalized later
    pub internal_device_id: Option<serde_json::Value>,
    pub device_name: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub client: Option<String>,
    pub now_playing_item: Option<NowPlayingItemResponse>,
    pub play_state: Option<PlayStateResponse>,
}

/// `NowPlayingItem` of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NowPlayingItemResponse {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub item_type: Option<String>,
    pub series_name: Option<String>,
    pub parent_index_number: Option<u32>,
    pub index_number: Option<u32>,
    pub production_year: Option<i32>,
    pub run_time_ticks: Option<i64>,
    pub media_streams: Vec<MediaStreamResponse>,
}

/// Entry of `NowPlayingItem.MediaStreams`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MediaStreamResponse {
    pub index: Option<i32>,
    /// `Video`, `Audio` or `Subtitle`
    #[serde(rename = "Type")]
    pub stream_type: Option<String>,
    pub language: Option<String>,
    pub display_language: Option<String>,
    pub display_title: Option<String>,
    pub codec: Option<String>,
    pub channels: Option<u32>,
    pub channel_layout: Option<String>,
    pub is_default: bool,
    pub is_forced: bool,
    pub is_external: bool,
}

/// `PlayState` of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PlayStateResponse {
    pub position_ticks: Option<i64>,
    pub is_paused: bool,
    pub is_muted: bool,
    pub can_seek: bool,
    pub audio_stream_index: Option<i32>,
    pub subtitle_stream_index: Option<i32>,
}

/// Entry of `/Devices`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeviceResponse {
    pub id: Option<String>,
    pub internal_id: Option<serde_json::Value>,
    pub name: Option<String>,
    pub reported_device_id: Option<String>,
    pub last_user_name: Option<String>,
    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub date_last_activity: Option<String>,
}

/// Entry of `/Users`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserResponse {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Entry of `/ScheduledTasks`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ScheduledTaskResponse {
    pub id: Option<String>,
    pub name: Option<String>,
    pub state: Option<String>,
    pub category: Option<String>,
    pub current_progress_percentage: Option<f64>,
}

/// Entry of `/System/ActivityLog/Entries`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ActivityEntryResponse {
    pub id: Option<serde_json::Value>,
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub entry_type: Option<String>,
    pub date: Option<String>,
    pub severity: Option<String>,
}
