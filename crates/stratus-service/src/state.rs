//! Application state shared between the refresher and request handlers.
//!
//! # Event Bus
//!
//! The `events_tx` broadcast channel decouples observers (status surfaces,
//! tests) from the refresher. If a subscriber falls behind and the buffer
//! fills, old events are dropped; senders never block.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stratus_store::Store;
use tokio::sync::{Mutex, broadcast, watch};

use crate::config::Config;
use crate::refresher::CycleOutcome;

/// Broadcast buffer size for sync events.
const EVENT_BUFFER: usize = 100;

/// Shared application state.
pub struct AppState {
    /// The data store (wrapped in Mutex for thread-safe access).
    pub store: Mutex<Store>,
    /// Configuration, immutable after load.
    pub config: Config,
    /// Broadcast channel for sync events.
    pub events_tx: broadcast::Sender<SyncEvent>,
    /// Refresher control state.
    pub refresher: RefresherState,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: Store, config: Config) -> Arc<Self> {
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER);
        Arc::new(Self {
            store: Mutex::new(store),
            config,
            events_tx,
            refresher: RefresherState::new(),
        })
    }

    /// Publish a sync event. Lossy when nobody is subscribed.
    pub fn publish(&self, event: SyncEvent) {
        let _ = self.events_tx.send(event);
    }
}

/// An event published on the state's broadcast bus.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A snapshot was written to the cache.
    SnapshotStored {
        /// Cache key the snapshot was stored under.
        location_key: String,
    },
    /// A queue flush pass finished.
    QueueFlushed {
        /// Queue that was flushed.
        queue: String,
        /// Actions delivered this pass.
        delivered: usize,
        /// Actions still queued.
        remaining: usize,
    },
    /// A notification was handed to the sink.
    NotificationSent {
        /// Notification title.
        title: String,
    },
    /// A refresh cycle finished.
    CycleCompleted {
        /// How the cycle ended.
        outcome: CycleOutcome,
    },
}

/// State for tracking and controlling the refresher.
pub struct RefresherState {
    /// Whether the refresher is currently running.
    running: AtomicBool,
    /// Channel to signal the refresher task to stop.
    stop_tx: watch::Sender<bool>,
    /// Receiver for stop signal (cloned by the refresher task).
    stop_rx: watch::Receiver<bool>,
}

impl RefresherState {
    /// Create a new refresher state.
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            running: AtomicBool::new(false),
            stop_tx,
            stop_rx,
        }
    }

    /// Check if the refresher is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Mark the refresher as started or stopped.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Get a receiver for the stop signal.
    pub fn subscribe_stop(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    /// Signal the refresher task to stop.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Default for RefresherState {
    fn default() -> Self {
        Self::new()
    }
}
