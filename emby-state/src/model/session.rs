//! Playback sessions and what they are playing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::ids::{DeviceId, SessionId};
use super::stream::{audio_track_label, subtitle_track_label, MediaStream};

/// Emby ticks per second (one tick is 100 ns)
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Convert a tick count into a duration, treating negatives as zero
pub fn ticks_to_duration(ticks: i64) -> Duration {
    let ticks = ticks.max(0) as u64;
    Duration::from_nanos(ticks.saturating_mul(100))
}

/// Playback state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayState {
    Playing,
    Paused,
    /// Nothing loaded
    #[default]
    Idle,
}

impl PlayState {
    /// Derive the state from the session's now-playing item and pause flag
    pub fn from_session(has_item: bool, is_paused: bool) -> Self {
        match (has_item, is_paused) {
            (false, _) => PlayState::Idle,
            (true, true) => PlayState::Paused,
            (true, false) => PlayState::Playing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayState::Playing => "playing",
            PlayState::Paused => "paused",
            PlayState::Idle => "idle",
        }
    }
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of media item, from the item's `Type`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Movie,
    Episode,
    Audio,
    Video,
    Other(String),
}

impl MediaKind {
    pub fn from_item_type(item_type: &str) -> Self {
        match item_type.to_ascii_lowercase().as_str() {
            "movie" => MediaKind::Movie,
            "episode" => MediaKind::Episode,
            "audio" | "music" | "song" | "audiobook" => MediaKind::Audio,
            "video" | "musicvideo" | "trailer" | "tvchannel" => MediaKind::Video,
            _ => MediaKind::Other(item_type.to_string()),
        }
    }

    /// Coarse content type: "video", "music" or "unknown"
    pub fn content_type(&self) -> &'static str {
        match self {
            MediaKind::Movie | MediaKind::Episode | MediaKind::Video => "video",
            MediaKind::Audio => "music",
            MediaKind::Other(_) => "unknown",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Movie => f.write_str("movie"),
            MediaKind::Episode => f.write_str("episode"),
            MediaKind::Audio => f.write_str("audio"),
            MediaKind::Video => f.write_str("video"),
            MediaKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// The item a session is playing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlayingItem {
    pub title: Option<String>,
    pub media_kind: MediaKind,
    pub runtime_ticks: Option<i64>,
    pub position_ticks: Option<i64>,
    pub series_name: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub production_year: Option<i32>,
    pub streams: Vec<MediaStream>,
    /// Selected audio stream, from the session's play state
    pub audio_stream_index: Option<i32>,
    /// Selected subtitle stream; `None` means subtitles are off
    pub subtitle_stream_index: Option<i32>,
}

impl NowPlayingItem {
    /// Playback progress in whole percent
    ///
    /// `None` when the runtime is unknown or zero. A missing position counts
    /// as the start of the item.
    pub fn progress_percent(&self) -> Option<u8> {
        let runtime = self.runtime_ticks.filter(|r| *r > 0)?;
        let position = self.position_ticks.unwrap_or(0).max(0);
        let percent = (position as i128 * 100) / runtime as i128;
        Some(percent.clamp(0, 100) as u8)
    }

    pub fn position(&self) -> Duration {
        ticks_to_duration(self.position_ticks.unwrap_or(0))
    }

    /// Time left until the end of the item, clamped at zero
    pub fn remaining_time(&self) -> Option<Duration> {
        let runtime = self.runtime_ticks.filter(|r| *r > 0)?;
        Some(ticks_to_duration(runtime).saturating_sub(self.position()))
    }

    pub fn audio_track(&self) -> String {
        audio_track_label(&self.streams, self.audio_stream_index)
    }

    pub fn subtitle_track(&self) -> String {
        subtitle_track_label(&self.streams, self.subtitle_stream_index)
    }
}

/// An active playback context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub device_id: Option<DeviceId>,
    /// Server-internal numeric id of the device, as a string
    pub internal_device_id: Option<String>,
    pub device_name: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub client: Option<String>,
    pub now_playing: Option<NowPlayingItem>,
    pub play_state: PlayState,
    pub is_muted: bool,
}

impl Session {
    /// Whether `id` names this session's device, by device id or internal id
    pub fn is_on_device(&self, id: &DeviceId) -> bool {
        self.device_id.as_ref() == Some(id)
            || self.internal_device_id.as_deref() == Some(id.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.now_playing.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn item(runtime: Option<i64>, position: Option<i64>) -> NowPlayingItem {
        NowPlayingItem {
            title: Some("Inception".to_string()),
            media_kind: MediaKind::Movie,
            runtime_ticks: runtime,
            position_ticks: position,
            series_name: None,
            season: None,
            episode: None,
            production_year: Some(2010),
            streams: Vec::new(),
            audio_stream_index: None,
            subtitle_stream_index: None,
        }
    }

    #[rstest]
    #[case(Some(100), Some(25), Some(25))]
    #[case(Some(100), Some(0), Some(0))]
    #[case(Some(3), Some(2), Some(66))]
    #[case(Some(100), Some(150), Some(100))]
    #[case(Some(100), None, Some(0))]
    #[case(Some(0), Some(25), None)]
    #[case(None, Some(25), None)]
    fn test_progress_percent(
        #[case] runtime: Option<i64>,
        #[case] position: Option<i64>,
        #[case] expected: Option<u8>,
    ) {
        assert_eq!(item(runtime, position).progress_percent(), expected);
    }

    #[test]
    fn test_remaining_time() {
        let playing = item(Some(90 * TICKS_PER_SECOND), Some(30 * TICKS_PER_SECOND));
        assert_eq!(playing.remaining_time(), Some(Duration::from_secs(60)));

        let overrun = item(Some(10 * TICKS_PER_SECOND), Some(20 * TICKS_PER_SECOND));
        assert_eq!(overrun.remaining_time(), Some(Duration::ZERO));

        assert_eq!(item(None, Some(5)).remaining_time(), None);
    }

    #[test]
    fn test_play_state_from_session() {
        assert_eq!(PlayState::from_session(false, true), PlayState::Idle);
        assert_eq!(PlayState::from_session(true, true), PlayState::Paused);
        assert_eq!(PlayState::from_session(true, false), PlayState::Playing);
    }

    #[test]
    fn test_media_kind_content_type() {
        assert_eq!(MediaKind::from_item_type("Movie"), MediaKind::Movie);
        assert_eq!(MediaKind::from_item_type("Audio").content_type(), "music");
        assert_eq!(MediaKind::from_item_type("Episode").content_type(), "video");
        assert_eq!(
            MediaKind::from_item_type("Photo"),
            MediaKind::Other("Photo".to_string())
        );
    }
}
