//! Change detection and publication of derived state
//!
//! The publisher owns the last published [`DerivedState`]. Publishing a new
//! state diffs its entities against the published ones and broadcasts one
//! [`ChangeEvent`] per entity that was added, changed or removed. An
//! unchanged state publishes nothing.
//!
//! Cycles are serialized by a two-state guard (Idle/Publishing): a caller
//! that cannot take the guard skips its cycle instead of queueing it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::deriver::DerivedState;
use crate::entity::{EntityKey, EntityValue};
use crate::error::{Result, StateError};

/// Default capacity of the change event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// How an entity changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Updated,
    Removed,
}

/// One entity change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub key: EntityKey,
    pub kind: ChangeKind,
    /// New value; [`EntityValue::Unknown`] for removals
    pub value: EntityValue,
    /// `fetched_at` of the state that produced the change
    pub timestamp: DateTime<Utc>,
}

/// Diff two entity maps
///
/// Events come out in key order: additions and updates, then removals.
pub fn diff_entities(
    previous: &BTreeMap<EntityKey, EntityValue>,
    next: &BTreeMap<EntityKey, EntityValue>,
    timestamp: DateTime<Utc>,
) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for (key, value) in next {
        let kind = match previous.get(key) {
            None => ChangeKind::Added,
            Some(old) if old != value => ChangeKind::Updated,
            Some(_) => continue,
        };
        events.push(ChangeEvent {
            key: key.clone(),
            kind,
            value: value.clone(),
            timestamp,
        });
    }

    for key in previous.keys().filter(|k| !next.contains_key(*k)) {
        events.push(ChangeEvent {
            key: key.clone(),
            kind: ChangeKind::Removed,
            value: EntityValue::Unknown,
            timestamp,
        });
    }

    events
}

/// Held for the duration of one cycle; releases the guard on drop
#[must_use = "the cycle guard is released as soon as it is dropped"]
pub struct PublishGuard<'a> {
    publisher: &'a TransitionPublisher,
}

impl PublishGuard<'_> {
    /// Publish `state` within this cycle
    pub fn publish(&self, state: DerivedState) -> Result<Vec<ChangeEvent>> {
        self.publisher.publish_locked(state)
    }
}

impl Drop for PublishGuard<'_> {
    fn drop(&mut self) {
        self.publisher.publishing.store(false, Ordering::Release);
    }
}

/// Publishes derived state and its changes
pub struct TransitionPublisher {
    publishing: AtomicBool,
    published: Mutex<BTreeMap<EntityKey, EntityValue>>,
    state_tx: watch::Sender<Option<Arc<DerivedState>>>,
    events_tx: broadcast::Sender<ChangeEvent>,
}

impl TransitionPublisher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a publisher whose event channel buffers `capacity` events per
    /// subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        let (state_tx, _) = watch::channel(None);
        let (events_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            publishing: AtomicBool::new(false),
            published: Mutex::new(BTreeMap::new()),
            state_tx,
            events_tx,
        }
    }

    /// Enter the Publishing state, or `None` if a cycle is already running
    pub fn try_begin(&self) -> Option<PublishGuard<'_>> {
        self.publishing
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| PublishGuard { publisher: self })
    }

    pub fn is_publishing(&self) -> bool {
        self.publishing.load(Ordering::Acquire)
    }

    /// Publish `state` as a cycle of its own
    ///
    /// Fails with [`StateError::PublishInProgress`] while another cycle holds
    /// the guard.
    pub fn publish(&self, state: DerivedState) -> Result<Vec<ChangeEvent>> {
        let guard = self.try_begin().ok_or(StateError::PublishInProgress)?;
        guard.publish(state)
    }

    fn publish_locked(&self, state: DerivedState) -> Result<Vec<ChangeEvent>> {
        if let Some(current) = self.current_state() {
            if state.fetched_at < current.fetched_at {
                warn!(
                    candidate = %state.fetched_at,
                    published = %current.fetched_at,
                    "Rejecting stale derived state, keeping the published one"
                );
                return Err(StateError::StaleState {
                    candidate: state.fetched_at,
                    published: current.fetched_at,
                });
            }
        }

        let next = state.entities();
        let events = {
            let mut published = self.published.lock();
            let events = diff_entities(&published, &next, state.fetched_at);
            *published = next;
            events
        };

        self.state_tx.send_replace(Some(Arc::new(state)));

        if events.is_empty() {
            debug!("State unchanged, nothing to publish");
        } else {
            info!(changes = events.len(), "Published state changes");
        }
        for event in &events {
            // No subscribers is fine
            let _ = self.events_tx.send(event.clone());
        }

        Ok(events)
    }

    /// The last published state
    pub fn current_state(&self) -> Option<Arc<DerivedState>> {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to change events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events_tx.subscribe()
    }

    /// Watch the published state
    pub fn watch(&self) -> watch::Receiver<Option<Arc<DerivedState>>> {
        self.state_tx.subscribe()
    }
}

impl Default for TransitionPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransitionPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionPublisher")
            .field("publishing", &self.is_publishing())
            .field("entities", &self.published.lock().len())
            .finish()
    }
}
