//! Scripted upstream for driver tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use emby_client::{FetchError, FetchErrorKind, QueryKind, UpstreamApi};
use emby_monitor::{EmbyMonitor, MonitorConfig};
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Default)]
pub struct MockEmby {
    responses: Mutex<HashMap<QueryKind, Result<Value, FetchError>>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<HashMap<QueryKind, usize>>,
}

impl MockEmby {
    pub fn healthy() -> Arc<Self> {
        let mock = Self::default();
        mock.respond(QueryKind::SystemInfo, json!({ "ServerName": "Basement", "Version": "4.8.0.80" }));
        mock.respond(QueryKind::SystemEndpoint, json!({ "IsLocal": true, "IsInNetwork": true }));
        mock.respond(QueryKind::LibraryCounts, json!({ "MovieCount": 12, "SeriesCount": 3, "EpisodeCount": 40 }));
        mock.respond(QueryKind::LibraryFolders, json!({ "Items": [{ "Name": "Movies" }] }));
        mock.respond(QueryKind::Sessions, json!([playing_session("tv1", 25)]));
        mock.respond(QueryKind::Users, json!([{ "Id": "u1", "Name": "ana" }]));
        mock.respond(QueryKind::ActivityLog, json!({ "Items": [] }));
        mock.respond(QueryKind::ScheduledTasks, json!([]));
        mock.respond(QueryKind::Devices, json!({ "Items": [{ "Id": "1", "ReportedDeviceId": "tv1", "Name": "TV" }] }));
        Arc::new(mock)
    }

    pub fn respond(&self, query: QueryKind, body: Value) {
        self.responses.lock().insert(query, Ok(body));
    }

    pub fn fail(&self, query: QueryKind, kind: FetchErrorKind) {
        self.responses
            .lock()
            .insert(query, Err(FetchError::new(kind, query, "mock failure")));
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self, query: QueryKind) -> usize {
        self.calls.lock().get(&query).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl UpstreamApi for MockEmby {
    async fn fetch(&self, query: QueryKind) -> Result<Value, FetchError> {
        *self.calls.lock().entry(query).or_insert(0) += 1;

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .lock()
            .get(&query)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::unreachable(query, "no mock response")))
    }
}

/// A session on `device` playing a movie at `percent` of its runtime
pub fn playing_session(device: &str, percent: i64) -> Value {
    json!({
        "Id": format!("session-{}", device),
        "DeviceId": device,
        "DeviceName": "TV",
        "UserName": "ana",
        "NowPlayingItem": { "Name": "Inception", "Type": "Movie", "ProductionYear": 2010, "RunTimeTicks": 100 },
        "PlayState": { "PositionTicks": percent, "IsPaused": false }
    })
}

pub fn config() -> MonitorConfig {
    MonitorConfig::builder("emby.test", "key")
        .build()
        .expect("valid config")
}

pub fn monitor_with(mock: &Arc<MockEmby>, config: MonitorConfig) -> EmbyMonitor {
    EmbyMonitor::with_api(config, mock.clone()).expect("valid monitor")
}
