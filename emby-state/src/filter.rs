//! Device filtering policy

use std::collections::BTreeSet;

use crate::model::{Device, DeviceId, Session};
use crate::snapshot::Snapshot;

/// Which devices are monitored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeviceFilter {
    /// Every device
    #[default]
    All,
    /// Only these ids; unknown ids match nothing
    Only(BTreeSet<DeviceId>),
}

impl DeviceFilter {
    /// Build a filter from configured ids
    ///
    /// Blank entries are ignored. An empty list, or any entry equal to
    /// `all` (case-insensitive), selects every device.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for id in ids {
            let id = id.as_ref().trim();
            if id.is_empty() {
                continue;
            }
            if id.eq_ignore_ascii_case("all") {
                return DeviceFilter::All;
            }
            set.insert(DeviceId::new(id));
        }

        if set.is_empty() {
            DeviceFilter::All
        } else {
            DeviceFilter::Only(set)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, DeviceFilter::All)
    }

    /// The configured ids, or `None` for all devices
    pub fn monitored(&self) -> Option<&BTreeSet<DeviceId>> {
        match self {
            DeviceFilter::All => None,
            DeviceFilter::Only(ids) => Some(ids),
        }
    }

    pub fn matches_session(&self, session: &Session) -> bool {
        match self {
            DeviceFilter::All => true,
            DeviceFilter::Only(ids) => ids.iter().any(|id| session.is_on_device(id)),
        }
    }

    pub fn matches_device(&self, device: &Device) -> bool {
        match self {
            DeviceFilter::All => true,
            DeviceFilter::Only(ids) => ids.iter().any(|id| device.has_id(id)),
        }
    }

    /// Drop sessions and devices outside the monitored set
    ///
    /// Identity for [`DeviceFilter::All`]; idempotent for every filter.
    pub fn apply(&self, snapshot: &Snapshot) -> Snapshot {
        if self.is_all() {
            return snapshot.clone();
        }

        Snapshot {
            sessions: snapshot
                .sessions
                .iter()
                .filter(|s| self.matches_session(s))
                .cloned()
                .collect(),
            devices: snapshot
                .devices
                .iter()
                .filter(|d| self.matches_device(d))
                .cloned()
                .collect(),
            ..snapshot.clone()
        }
    }
}

/// Reduce `snapshot` to the devices selected by `filter`
pub fn filter(snapshot: &Snapshot, filter: &DeviceFilter) -> Snapshot {
    filter.apply(snapshot)
}
