//! Derivation scenarios and properties

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::{inception_session, ScriptedApi};
use emby_client::QueryKind;
use emby_state::{
    derive, filter, DeviceFilter, DeviceId, MediaKind, NowPlayingItem, PlayState, ServerInfo,
    Session, SessionId, Snapshot, SnapshotAggregator, TransitionPublisher,
};
use proptest::prelude::*;
use serde_json::json;

async fn snapshot_with_sessions(sessions: serde_json::Value) -> Snapshot {
    let api = Arc::new(ScriptedApi::healthy());
    api.respond(QueryKind::Sessions, sessions);
    SnapshotAggregator::new(api).aggregate().await
}

#[tokio::test]
async fn test_playing_session_with_all_filter() {
    let snapshot = snapshot_with_sessions(json!([inception_session("tv1")])).await;
    let filter = DeviceFilter::from_ids(["all"]);
    let state = derive(&filter.apply(&snapshot), &filter);

    assert!(state.has_active_playback);
    let tv1 = &state.devices[&DeviceId::from("tv1")];
    assert_eq!(tv1.progress_percent, Some(25));
    assert_eq!(tv1.playback_state, PlayState::Playing);
    assert_eq!(tv1.now_playing_label, "Inception (2010)");
}

#[tokio::test]
async fn test_playing_session_outside_filter() {
    let snapshot = snapshot_with_sessions(json!([inception_session("tv1")])).await;
    let filter = DeviceFilter::from_ids(["tv2"]);
    let state = derive(&filter.apply(&snapshot), &filter);

    assert!(!state.has_active_playback);
    assert!(!state.devices.contains_key(&DeviceId::from("tv1")));
    assert_eq!(state.devices[&DeviceId::from("tv2")].now_playing_label, "Idle");
}

#[tokio::test]
async fn test_republishing_same_snapshot_is_silent() {
    let snapshot = snapshot_with_sessions(json!([inception_session("tv1")])).await;
    let publisher = TransitionPublisher::new();

    let first = publisher.publish(derive(&snapshot, &DeviceFilter::All)).unwrap();
    assert!(!first.is_empty());
    let second = publisher.publish(derive(&snapshot, &DeviceFilter::All)).unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_session_end_resets_device_to_idle() {
    let api = Arc::new(ScriptedApi::healthy());
    let aggregator = SnapshotAggregator::new(api.clone());
    let publisher = TransitionPublisher::new();
    let filter = DeviceFilter::from_ids(["tv1"]);

    publisher
        .publish(derive(&aggregator.aggregate().await, &filter))
        .unwrap();

    api.respond(QueryKind::Sessions, json!([]));
    let events = publisher
        .publish(derive(&aggregator.aggregate().await, &filter))
        .unwrap();

    let label = events
        .iter()
        .find(|e| e.key.as_str() == "device.tv1.now_playing")
        .expect("label changed");
    assert_eq!(label.value.to_string(), "Idle");
    assert!(events.iter().any(|e| e.key.as_str() == "server.active_playback"));
}

#[tokio::test]
async fn test_dropped_device_is_removed() {
    let api = Arc::new(ScriptedApi::healthy());
    let aggregator = SnapshotAggregator::new(api.clone());
    let publisher = TransitionPublisher::new();

    publisher
        .publish(derive(&aggregator.aggregate().await, &DeviceFilter::All))
        .unwrap();

    api.respond(
        QueryKind::Devices,
        json!({ "Items": [{ "Id": "1", "ReportedDeviceId": "tv1", "Name": "Living Room TV" }] }),
    );
    let events = publisher
        .publish(derive(&aggregator.aggregate().await, &DeviceFilter::All))
        .unwrap();

    let removed: Vec<_> = events
        .iter()
        .filter(|e| e.key.device_id() == Some("phone"))
        .collect();
    assert_eq!(removed.len(), emby_state::entity::DEVICE_FIELDS.len());
    assert!(removed
        .iter()
        .all(|e| e.kind == emby_state::ChangeKind::Removed));
}

// ============================================================================
// Properties
// ============================================================================

fn arb_session() -> impl Strategy<Value = Session> {
    (
        0..4u8,
        0..3u8,
        any::<bool>(),
        any::<bool>(),
        proptest::option::of(0..1_000_000i64),
        proptest::option::of(0..2_000_000i64),
    )
        .prop_map(|(device, seq, playing, paused, runtime, position)| {
            let now_playing = playing.then(|| NowPlayingItem {
                title: Some(format!("Title {}", seq)),
                media_kind: MediaKind::Movie,
                runtime_ticks: runtime,
                position_ticks: position,
                series_name: None,
                season: None,
                episode: None,
                production_year: None,
                streams: Vec::new(),
                audio_stream_index: None,
                subtitle_stream_index: None,
            });
            Session {
                session_id: SessionId::new(format!("s{}-{}", device, seq)),
                device_id: Some(DeviceId::new(format!("dev{}", device))),
                internal_device_id: Some(format!("{}", 100 + device)),
                device_name: Some(format!("Device {}", device)),
                user_id: None,
                user_name: None,
                client: None,
                play_state: PlayState::from_session(now_playing.is_some(), paused),
                now_playing,
                is_muted: false,
            }
        })
}

fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
    (
        proptest::collection::vec(arb_session(), 0..6),
        0..3u32,
        1..4u32,
        any::<bool>(),
    )
        .prop_map(|(sessions, failures, threshold, known)| {
            let mut snapshot =
                Snapshot::empty(Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap(), threshold);
            snapshot.server = known.then(ServerInfo::default);
            snapshot.sessions = sessions;
            snapshot.system_info_failures = failures;
            snapshot
        })
}

fn arb_filter() -> impl Strategy<Value = DeviceFilter> {
    prop_oneof![
        Just(DeviceFilter::All),
        proptest::collection::vec("(dev[0-5]|10[0-5])", 0..4).prop_map(DeviceFilter::from_ids),
    ]
}

proptest! {
    #[test]
    fn prop_derive_is_deterministic(snapshot in arb_snapshot(), filter in arb_filter()) {
        let filtered = filter.apply(&snapshot);
        prop_assert_eq!(derive(&filtered, &filter), derive(&filtered, &filter));
    }

    #[test]
    fn prop_filter_is_idempotent(snapshot in arb_snapshot(), device_filter in arb_filter()) {
        let once = filter(&snapshot, &device_filter);
        let twice = filter(&once, &device_filter);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_progress_is_bounded(runtime in 0..10_000_000i64, position in 0..20_000_000i64) {
        let item = NowPlayingItem {
            title: None,
            media_kind: MediaKind::Video,
            runtime_ticks: Some(runtime),
            position_ticks: Some(position),
            series_name: None,
            season: None,
            episode: None,
            production_year: None,
            streams: Vec::new(),
            audio_stream_index: None,
            subtitle_stream_index: None,
        };
        match item.progress_percent() {
            Some(percent) => {
                prop_assert!(runtime > 0);
                prop_assert!(percent <= 100);
            }
            None => prop_assert_eq!(runtime, 0),
        }
    }

    #[test]
    fn prop_filtered_devices_stay_in_filter(snapshot in arb_snapshot(), filter in arb_filter()) {
        let state = derive(&filter.apply(&snapshot), &filter);
        if let Some(ids) = filter.monitored() {
            prop_assert!(state.devices.keys().all(|id| ids.contains(id)));
            prop_assert_eq!(state.devices.len(), ids.len());
        }
    }
}
