//! Shared test fixtures: a scripted upstream and canned Emby responses

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use emby_client::{FetchError, FetchErrorKind, QueryKind, UpstreamApi};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Upstream whose answers are set per query by the test
#[derive(Default)]
pub struct ScriptedApi {
    responses: Mutex<HashMap<QueryKind, Result<Value, FetchError>>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl ScriptedApi {
    /// An upstream answering every query with the healthy fixtures
    pub fn healthy() -> Self {
        let api = Self::default();
        for query in QueryKind::ALL {
            api.respond(query, healthy_body(query));
        }
        api
    }

    pub fn respond(&self, query: QueryKind, body: Value) {
        self.responses.lock().insert(query, Ok(body));
    }

    pub fn fail(&self, query: QueryKind, kind: FetchErrorKind) {
        self.responses
            .lock()
            .insert(query, Err(FetchError::new(kind, query, "scripted failure")));
    }

    pub fn fail_all(&self, kind: FetchErrorKind) {
        for query in QueryKind::ALL {
            self.fail(query, kind);
        }
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamApi for ScriptedApi {
    async fn fetch(&self, query: QueryKind) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .get(&query)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::unreachable(query, "no scripted response")))
    }
}

/// Healthy response body for `query`
pub fn healthy_body(query: QueryKind) -> Value {
    match query {
        QueryKind::SystemInfo => json!({
            "ServerName": "Basement",
            "Version": "4.8.0.80",
            "OperatingSystem": "Linux",
            "Id": "srv-1",
            "HasPendingRestart": false
        }),
        QueryKind::SystemEndpoint => json!({ "IsLocal": true, "IsInNetwork": true }),
        QueryKind::LibraryCounts => json!({
            "MovieCount": 120,
            "SeriesCount": 15,
            "EpisodeCount": 640,
            "SongCount": 0
        }),
        QueryKind::LibraryFolders => json!({
            "Items": [
                { "Id": "f1", "Name": "Movies", "CollectionType": "movies" },
                { "Id": "f2", "Name": "Shows", "CollectionType": "tvshows" }
            ]
        }),
        QueryKind::Sessions => json!([inception_session("tv1")]),
        QueryKind::Users => json!([{ "Id": "u1", "Name": "ana" }, { "Id": "u2", "Name": "bo" }]),
        QueryKind::ActivityLog => json!({ "Items": [], "TotalRecordCount": 0 }),
        QueryKind::ScheduledTasks => json!([{ "Name": "Scan media library", "State": "Idle" }]),
        QueryKind::Devices => json!({
            "Items": [
                { "Id": "1", "ReportedDeviceId": "tv1", "Name": "Living Room TV" },
                { "Id": "2", "ReportedDeviceId": "phone", "Name": "Phone" }
            ]
        }),
    }
}

/// A session on `device` playing Inception a quarter of the way through
pub fn inception_session(device: &str) -> Value {
    json!({
        "Id": format!("session-{}", device),
        "DeviceId": device,
        "DeviceName": "Living Room TV",
        "UserName": "ana",
        "NowPlayingItem": {
            "Name": "Inception",
            "Type": "Movie",
            "ProductionYear": 2010,
            "RunTimeTicks": 100
        },
        "PlayState": { "PositionTicks": 25, "IsPaused": false }
    })
}
