//! Driver behavior against a mock upstream

mod common;

use std::time::Duration;

use common::{config, monitor_with, playing_session, MockEmby};
use emby_client::{FetchErrorKind, QueryKind};
use emby_monitor::{
    CycleOutcome, DeviceId, EmbyMonitor, MonitorConfig, MonitorError, PlayState,
};
use serde_json::json;

#[tokio::test]
async fn test_first_cycle_publishes_everything() {
    let mock = MockEmby::healthy();
    let monitor = monitor_with(&mock, config());
    let mut changes = monitor.changes();

    let outcome = monitor.run_cycle().await;
    let CycleOutcome::Published {
        changes: count,
        failed_queries,
    } = outcome
    else {
        panic!("expected a published cycle, got {:?}", outcome);
    };
    assert!(count > 0);
    assert_eq!(failed_queries, 0);
    assert_eq!(mock.total_calls(), QueryKind::ALL.len());

    let state = monitor.current_state().expect("state published");
    assert!(state.server_online);
    assert!(state.has_active_playback);
    let tv1 = &state.devices[&DeviceId::from("tv1")];
    assert_eq!(tv1.playback_state, PlayState::Playing);
    assert_eq!(tv1.progress_percent, Some(25));

    let first = changes.recv().await.unwrap();
    assert_eq!(first.timestamp, state.fetched_at);
}

#[tokio::test]
async fn test_unchanged_cycle_emits_nothing() {
    let mock = MockEmby::healthy();
    let monitor = monitor_with(&mock, config());

    monitor.run_cycle().await;
    let outcome = monitor.run_cycle().await;
    assert_eq!(
        outcome,
        CycleOutcome::Published {
            changes: 0,
            failed_queries: 0
        }
    );
}

#[tokio::test]
async fn test_progress_change_is_published() {
    let mock = MockEmby::healthy();
    let monitor = monitor_with(&mock, config());
    monitor.run_cycle().await;

    mock.respond(QueryKind::Sessions, json!([playing_session("tv1", 50)]));
    let mut changes = monitor.changes();
    monitor.run_cycle().await;

    let mut keys = Vec::new();
    while let Ok(event) = changes.try_recv() {
        keys.push(event.key.to_string());
    }
    assert!(keys.contains(&"device.tv1.progress".to_string()));
    assert!(!keys.iter().any(|k| k.starts_with("server.")));
}

#[tokio::test]
async fn test_overlapping_cycle_is_skipped() {
    let mock = MockEmby::healthy();
    mock.set_delay(Some(Duration::from_millis(100)));
    let monitor = monitor_with(&mock, config());

    let (first, second) = tokio::join!(monitor.run_cycle(), monitor.refresh_now());

    assert!(matches!(first, CycleOutcome::Published { .. }));
    assert_eq!(second, CycleOutcome::Skipped);
    assert_eq!(mock.calls(QueryKind::SystemInfo), 1);

    let stats = monitor.stats();
    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.skipped, 1);
}

#[tokio::test]
async fn test_slow_cycle_is_abandoned() {
    let mock = MockEmby::healthy();
    let config = MonitorConfig::builder("emby.test", "key")
        .with_query_timeout(Duration::from_millis(50))
        .with_cycle_ceiling(Duration::from_millis(100))
        .build()
        .unwrap();
    let monitor = monitor_with(&mock, config);
    assert!(matches!(
        monitor.run_cycle().await,
        CycleOutcome::Published { .. }
    ));

    mock.set_delay(Some(Duration::from_secs(30)));
    let outcome = monitor.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::Abandoned { changes } if changes > 0));

    let state = monitor.current_state().unwrap();
    assert!(!state.server_online);
    // Carried over from the last good cycle
    assert_eq!(state.library.movie_count, 12);
    assert!(monitor.last_snapshot().unwrap().errors.is_total_failure());
    assert_eq!(monitor.stats().abandoned, 1);
}

#[tokio::test]
async fn test_offline_threshold_from_config() {
    let mock = MockEmby::healthy();
    let config = MonitorConfig::builder("emby.test", "key")
        .with_offline_threshold(3)
        .build()
        .unwrap();
    let monitor = monitor_with(&mock, config);
    monitor.run_cycle().await;

    mock.fail(QueryKind::SystemInfo, FetchErrorKind::Timeout);
    monitor.run_cycle().await;
    monitor.run_cycle().await;
    assert!(monitor.current_state().unwrap().server_online);

    monitor.run_cycle().await;
    assert!(!monitor.current_state().unwrap().server_online);
}

#[tokio::test]
async fn test_connection_check_does_not_publish() {
    let mock = MockEmby::healthy();
    let monitor = monitor_with(&mock, config());

    let info = monitor.test_connection().await.unwrap();
    assert_eq!(info.name.as_deref(), Some("Basement"));
    assert_eq!(mock.total_calls(), 1);
    assert!(monitor.current_state().is_none());
    assert!(monitor.last_snapshot().is_none());
}

#[tokio::test]
async fn test_connection_check_reports_auth_failure() {
    let mock = MockEmby::healthy();
    let monitor = monitor_with(&mock, config());
    monitor.run_cycle().await;

    mock.fail(QueryKind::SystemInfo, FetchErrorKind::AuthFailed);
    let err = monitor.test_connection().await.unwrap_err();
    assert!(matches!(
        err,
        MonitorError::Connection(ref e) if e.kind == FetchErrorKind::AuthFailed
    ));

    // Published state and the failure streak are untouched
    let state = monitor.current_state().unwrap();
    assert!(state.server_online);
    assert_eq!(monitor.last_snapshot().unwrap().system_info_failures, 0);
}

#[tokio::test]
async fn test_connection_check_requires_server_name() {
    let mock = MockEmby::healthy();
    mock.respond(QueryKind::SystemInfo, json!({ "Version": "4.8" }));
    let monitor = monitor_with(&mock, config());

    let err = monitor.test_connection().await.unwrap_err();
    assert!(matches!(
        err,
        MonitorError::Connection(ref e) if e.kind == FetchErrorKind::MalformedResponse
    ));
}

#[tokio::test(start_paused = true)]
async fn test_polling_loop_ticks_and_refreshes() {
    let mock = MockEmby::healthy();
    let monitor = monitor_with(&mock, config());
    let mut state = monitor.watch_state();

    let handle = monitor.start().unwrap();
    assert!(matches!(monitor.start(), Err(MonitorError::AlreadyRunning)));

    state.changed().await.unwrap();
    assert_eq!(monitor.stats().cycles, 1);

    monitor.request_refresh();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(monitor.stats().cycles, 2);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(monitor.stats().cycles, 3);

    handle.shutdown().await.unwrap();
    assert!(!monitor.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_during_cycle_is_skipped_not_queued() {
    let mock = MockEmby::healthy();
    mock.set_delay(Some(Duration::from_secs(5)));
    let monitor = monitor_with(&mock, config());

    let handle = monitor.start().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    monitor.request_refresh();

    tokio::time::sleep(Duration::from_secs(15)).await;
    let stats = monitor.stats();
    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(mock.calls(QueryKind::SystemInfo), 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_refresh_before_start_is_ignored() {
    let mock = MockEmby::healthy();
    let monitor = monitor_with(&mock, config());
    monitor.request_refresh();

    let mut state = monitor.watch_state();
    let handle = monitor.start().unwrap();
    state.changed().await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(monitor.stats().cycles, 1);
    assert_eq!(mock.calls(QueryKind::SystemInfo), 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_new_builds_http_client() {
    let monitor = EmbyMonitor::new(config()).unwrap();
    assert!(!monitor.is_running());
    assert_eq!(monitor.config().connection.port, 8096);
}
