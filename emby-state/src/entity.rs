//! Flat entity view of derived state
//!
//! Downstream consumers see state as a map from entity key to value. Server
//! and library facts use fixed keys; per-device facts follow the template
//! `device.<id>.<field>`, so the set of device entities changes with the
//! monitored device set.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::deriver::{format_duration, DerivedState, DeviceState};
use crate::model::DeviceId;

/// Per-device fields, in publication order
pub const DEVICE_FIELDS: [&str; 11] = [
    "name",
    "user",
    "playback_state",
    "now_playing",
    "media_kind",
    "progress",
    "position",
    "remaining",
    "audio_track",
    "subtitle_track",
    "muted",
];

/// Key of one published entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key of `field` on the device entity `id`
    pub fn device(id: &DeviceId, field: &str) -> Self {
        Self(format!("device.{}.{}", id, field))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Device id of a per-device key
    pub fn device_id(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("device.")?;
        let (id, _field) = rest.rsplit_once('.')?;
        Some(id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(s: &str) -> Self {
        EntityKey::new(s)
    }
}

/// Value of one published entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EntityValue {
    Bool(bool),
    Count(u64),
    Percent(u8),
    /// Whole seconds
    Seconds(u64),
    Text(String),
    /// The fact is not known right now
    Unknown,
}

impl EntityValue {
    fn text(value: Option<&str>) -> Self {
        value.map_or(EntityValue::Unknown, |v| EntityValue::Text(v.to_string()))
    }

    fn seconds(value: Option<std::time::Duration>) -> Self {
        value.map_or(EntityValue::Unknown, |d| EntityValue::Seconds(d.as_secs()))
    }
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityValue::Bool(true) => f.write_str("on"),
            EntityValue::Bool(false) => f.write_str("off"),
            EntityValue::Count(n) => write!(f, "{}", n),
            EntityValue::Percent(p) => write!(f, "{}%", p),
            EntityValue::Seconds(s) => {
                f.write_str(&format_duration(std::time::Duration::from_secs(*s)))
            }
            EntityValue::Text(text) => f.write_str(text),
            EntityValue::Unknown => f.write_str("unknown"),
        }
    }
}

impl DerivedState {
    /// Flatten into entity key/value pairs
    pub fn entities(&self) -> BTreeMap<EntityKey, EntityValue> {
        let mut entities = BTreeMap::new();
        let mut put = |key: &str, value: EntityValue| {
            entities.insert(EntityKey::new(key), value);
        };

        put("server.online", EntityValue::Bool(self.server_online));
        put("server.active_playback", EntityValue::Bool(self.has_active_playback));
        put("server.pending_restart", EntityValue::Bool(self.pending_restart));
        put("server.network_connected", EntityValue::Bool(self.network_connected));
        put("server.name", EntityValue::text(self.server_name.as_deref()));
        put("server.version", EntityValue::text(self.server_version.as_deref()));
        put(
            "server.in_network",
            self.is_in_network.map_or(EntityValue::Unknown, EntityValue::Bool),
        );
        put("server.tasks_running", EntityValue::Bool(self.tasks_running));
        put("server.library_scanning", EntityValue::Bool(self.library_scanning));
        put("server.active_sessions", EntityValue::Count(self.active_session_count as u64));
        put("server.devices", EntityValue::Count(self.device_count as u64));
        put("server.users", EntityValue::Count(self.user_count as u64));
        put("server.scheduled_tasks", EntityValue::Count(self.task_count as u64));
        put("server.activity_entries", EntityValue::Count(self.activity_count as u64));

        put("activity.today_plays", EntityValue::Count(self.today_play_count));
        put(
            "activity.today_watch_time",
            EntityValue::Seconds(self.today_watch_time.as_secs()),
        );

        put("library.movies", EntityValue::Count(self.library.movie_count));
        put("library.series", EntityValue::Count(self.library.series_count));
        put("library.episodes", EntityValue::Count(self.library.episode_count));
        put("library.total_items", EntityValue::Count(self.library.total_items()));
        put("library.folders", EntityValue::Count(self.library.library_folder_count));
        put("library.recently_added", EntityValue::Count(self.library.recently_added_count));
        put("library.latest_addition", EntityValue::text(self.latest_addition.as_deref()));

        for (id, device) in &self.devices {
            for (field, value) in device_entities(device) {
                entities.insert(EntityKey::device(id, field), value);
            }
        }

        entities
    }
}

fn device_entities(device: &DeviceState) -> [(&'static str, EntityValue); 11] {
    [
        (DEVICE_FIELDS[0], EntityValue::text(device.device_name.as_deref())),
        (DEVICE_FIELDS[1], EntityValue::text(device.user_name.as_deref())),
        (DEVICE_FIELDS[2], EntityValue::Text(device.playback_state.to_string())),
        (DEVICE_FIELDS[3], EntityValue::Text(device.now_playing_label.clone())),
        (
            DEVICE_FIELDS[4],
            EntityValue::text(device.media_kind.as_ref().map(|k| k.to_string()).as_deref()),
        ),
        (
            DEVICE_FIELDS[5],
            device.progress_percent.map_or(EntityValue::Unknown, EntityValue::Percent),
        ),
        (DEVICE_FIELDS[6], EntityValue::seconds(device.position)),
        (DEVICE_FIELDS[7], EntityValue::seconds(device.remaining_time)),
        (DEVICE_FIELDS[8], EntityValue::text(device.audio_track.as_deref())),
        (DEVICE_FIELDS[9], EntityValue::text(device.subtitle_track.as_deref())),
        (
            DEVICE_FIELDS[10],
            device.is_muted.map_or(EntityValue::Unknown, EntityValue::Bool),
        ),
    ]
}
