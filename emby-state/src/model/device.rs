//! Known client devices

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::DeviceId;
use super::session::Session;

/// A client device registered with the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Reported device id, the same id sessions carry
    pub device_id: DeviceId,
    /// Server-side id when it differs from the reported one
    pub internal_id: Option<String>,
    pub device_name: Option<String>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub app_name: Option<String>,
    pub last_user_name: Option<String>,
}

impl Device {
    /// Whether `id` names this device, by reported id or internal id
    pub fn has_id(&self, id: &DeviceId) -> bool {
        &self.device_id == id || self.internal_id.as_deref() == Some(id.as_str())
    }

    /// Whether `session` runs on this device under any of its ids
    pub fn serves_session(&self, session: &Session) -> bool {
        session.device_id.as_ref().is_some_and(|id| self.has_id(id))
            || session
                .internal_device_id
                .as_deref()
                .is_some_and(|internal| self.has_id(&DeviceId::from(internal)))
    }
}
