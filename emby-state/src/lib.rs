//! Emby State
//!
//! Turns raw Emby API responses into a stable, typed view of a media server
//! and publishes only what changed.
//!
//! # Architecture
//!
//! ```text
//! UpstreamApi → SnapshotAggregator → DeviceFilter → derive() → TransitionPublisher
//!  (queries)     (last known good)    (monitored)    (pure)     (diff + broadcast)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use emby_client::{ConnectionConfig, EmbyClient};
//! use emby_state::{derive, DeviceFilter, SnapshotAggregator, TransitionPublisher};
//!
//! let client = EmbyClient::new(&ConnectionConfig::new("192.168.1.20", "api-key"))?;
//! let aggregator = SnapshotAggregator::new(Arc::new(client));
//! let publisher = TransitionPublisher::new();
//! let filter = DeviceFilter::from_ids(["tv1"]);
//!
//! let snapshot = aggregator.aggregate().await;
//! let state = derive(&filter.apply(&snapshot), &filter);
//! for event in publisher.publish(state)? {
//!     println!("{} = {}", event.key, event.value);
//! }
//! ```

pub mod aggregator;
pub mod decode;
pub mod deriver;
pub mod entity;
pub mod error;
pub mod filter;
pub mod model;
pub mod publisher;
pub mod snapshot;

pub use aggregator::SnapshotAggregator;
pub use deriver::{derive, format_duration, now_playing_label, DerivedState, DeviceState, IDLE_LABEL};
pub use entity::{EntityKey, EntityValue};
pub use error::{Result, StateError};
pub use filter::{filter, DeviceFilter};
pub use model::{
    Device, DeviceId, LibraryCounts, MediaKind, NowPlayingItem, PlayState, ServerInfo, Session,
    SessionId,
};
pub use publisher::{ChangeEvent, ChangeKind, PublishGuard, TransitionPublisher};
pub use snapshot::{ErrorSet, Snapshot, DEFAULT_OFFLINE_THRESHOLD};
