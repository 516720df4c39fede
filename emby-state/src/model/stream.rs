//! Audio and subtitle tracks of a playing item

use serde::{Deserialize, Serialize};

/// Track label when the item has no track of the kind
pub const NO_TRACK_LABEL: &str = "None";

/// Subtitle label when subtitles exist but none is selected
pub const SUBTITLES_OFF_LABEL: &str = "Off";

const UNKNOWN_LANGUAGE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Other(String),
}

impl StreamKind {
    pub fn from_stream_type(stream_type: &str) -> Self {
        match stream_type {
            "Video" => StreamKind::Video,
            "Audio" => StreamKind::Audio,
            "Subtitle" => StreamKind::Subtitle,
            other => StreamKind::Other(other.to_string()),
        }
    }
}

/// One stream of a media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStream {
    pub index: Option<i32>,
    pub kind: StreamKind,
    /// Display language, falling back to the raw language code
    pub language: Option<String>,
    pub title: Option<String>,
    pub codec: Option<String>,
    pub channels: Option<u32>,
    pub channel_layout: Option<String>,
    pub is_default: bool,
    pub is_forced: bool,
}

impl MediaStream {
    fn language(&self) -> &str {
        self.language
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(UNKNOWN_LANGUAGE)
    }

    /// "English - SDH (Forced) (Default)"
    fn subtitle_label(&self) -> String {
        let language = self.language();
        let mut label = language.to_string();
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty() && *t != language) {
            label = format!("{} - {}", language, title);
        }
        if self.is_forced {
            label.push_str(" (Forced)");
        }
        if self.is_default {
            label.push_str(" (Default)");
        }
        label
    }

    /// "English (EAC3) 5.1 (Default)"
    fn audio_label(&self) -> String {
        let mut label = self.language().to_string();
        if let Some(codec) = self.codec.as_deref().filter(|c| !c.is_empty()) {
            label.push_str(&format!(" ({})", codec.to_uppercase()));
        }
        if let Some(channels) = self.channels.filter(|c| *c > 0) {
            match self.channel_layout.as_deref().filter(|l| !l.is_empty()) {
                Some(layout) => label.push_str(&format!(" {}", layout)),
                None => label.push_str(&format!(" {}ch", channels)),
            }
        }
        if self.is_default {
            label.push_str(" (Default)");
        }
        label
    }
}

/// Label of the selected subtitle track
///
/// [`NO_TRACK_LABEL`] when the item has no subtitles, [`SUBTITLES_OFF_LABEL`]
/// when none of them is selected.
pub fn subtitle_track_label(streams: &[MediaStream], selected: Option<i32>) -> String {
    let mut tracks = streams.iter().filter(|s| s.kind == StreamKind::Subtitle).peekable();
    if tracks.peek().is_none() {
        return NO_TRACK_LABEL.to_string();
    }

    selected
        .and_then(|index| tracks.find(|t| t.index == Some(index)))
        .map_or_else(|| SUBTITLES_OFF_LABEL.to_string(), MediaStream::subtitle_label)
}

/// Label of the selected audio track
///
/// Without a matching selection the first audio track is reported by
/// language and codec only.
pub fn audio_track_label(streams: &[MediaStream], selected: Option<i32>) -> String {
    let tracks: Vec<&MediaStream> = streams.iter().filter(|s| s.kind == StreamKind::Audio).collect();
    let Some(first) = tracks.first() else {
        return NO_TRACK_LABEL.to_string();
    };

    if let Some(track) = selected.and_then(|index| tracks.iter().find(|t| t.index == Some(index))) {
        return track.audio_label();
    }

    match first.codec.as_deref().filter(|c| !c.is_empty()) {
        Some(codec) => format!("{} ({})", first.language(), codec.to_uppercase()),
        None => first.language().to_string(),
    }
}
