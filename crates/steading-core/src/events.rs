//! Per-world broadcast bus for simulation events.
//!
//! Each world gets its own [`tokio::sync::broadcast`] channel, created
//! lazily on first subscription. Publishing to a world nobody listens to
//! is free: the event is dropped and the scheduler never blocks on slow
//! or absent listeners. A subscriber that falls behind by more than the
//! channel capacity receives a `Lagged` error and skips to the newest
//! event.

use std::collections::BTreeMap;

use tokio::sync::{Mutex, broadcast};

use steading_types::{SimEvent, WorldId};

/// Default capacity of each per-world broadcast channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Per-world broadcast bus for [`SimEvent`]s.
#[derive(Debug)]
pub struct EventBus {
    capacity: usize,
    channels: Mutex<BTreeMap<WorldId, broadcast::Sender<SimEvent>>>,
    /// Firehose channel carrying every world's events (for relays).
    all: broadcast::Sender<SimEvent>,
}

impl EventBus {
    /// Create a bus with the default per-world channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with an explicit per-world channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            channels: Mutex::new(BTreeMap::new()),
            all: broadcast::channel(capacity).0,
        }
    }

    /// Subscribe to all events broadcast for one world.
    pub async fn subscribe(&self, world_id: WorldId) -> broadcast::Receiver<SimEvent> {
        let mut channels = self.channels.lock().await;
        channels
            .entry(world_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Subscribe to the firehose: every event for every world.
    ///
    /// Used by relays that fan events out of the process (e.g. the NATS
    /// forwarder in the engine binary).
    pub fn subscribe_all(&self) -> broadcast::Receiver<SimEvent> {
        self.all.subscribe()
    }

    /// Publish an event on its world's channel and the firehose.
    ///
    /// Returns the number of world-channel receivers the event reached.
    /// Zero is normal: it means no listener has subscribed to that world
    /// (yet).
    pub async fn publish(&self, event: SimEvent) -> usize {
        // send returns Err only when there are zero receivers, which is
        // normal when nobody is listening.
        let _ = self.all.send(event.clone());
        let channels = self.channels.lock().await;
        channels
            .get(&event.world_id)
            .map_or(0, |sender| sender.send(event).unwrap_or(0))
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
