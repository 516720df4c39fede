//! Domain model for the Emby monitor
//!
//! These types are decoded from the wire types in `emby_client::models` and
//! are what snapshots and derived state are built from.

pub mod activity;
pub mod device;
pub mod ids;
pub mod server;
pub mod session;
pub mod stream;

pub use activity::{ActivityEntry, ActivitySummary, RecentAddition, ScheduledTask, RECENT_WINDOW_DAYS};
pub use device::Device;
pub use ids::{DeviceId, SessionId};
pub use server::{ItemCounts, LibraryCounts, MediaFolder, NetworkEndpoint, ServerInfo, User};
pub use session::{
    ticks_to_duration, MediaKind, NowPlayingItem, PlayState, Session, TICKS_PER_SECOND,
};
pub use stream::{MediaStream, StreamKind, NO_TRACK_LABEL, SUBTITLES_OFF_LABEL};
