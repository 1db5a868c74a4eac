//! Background refresh controller.
//!
//! Autonomously refreshes weather for the last known location on a fixed
//! wall-clock interval, flushes the sync queues, and sweeps aged-out cache
//! entries. Exactly one cycle is in flight at a time; a tick arriving while
//! a cycle is still running is dropped, not queued.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use stratus_store::CachedSnapshot;
use stratus_sync::{Outbox, WeatherSource, policy};
use stratus_types::Coordinates;

use crate::keys;
use crate::notify::{self, NotificationSink};
use crate::state::{AppState, SyncEvent};

/// How a refresh cycle ended.
///
/// Network-class failures are outcomes, not errors: the next tick retries
/// and nothing is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// No last known location is recorded; the cycle was skipped.
    NoLocation,
    /// The cached snapshot is inside the background freshness window; no
    /// network round-trip was needed.
    CacheFresh,
    /// The weather fetch failed; the cycle was skipped.
    FetchFailed,
    /// The cache was updated from a live fetch.
    Updated {
        /// Whether a notification was dispatched.
        notified: bool,
    },
}

/// Background refresher that drives the periodic sync cycle.
pub struct Refresher {
    state: Arc<AppState>,
    source: Arc<dyn WeatherSource>,
    sink: Arc<dyn NotificationSink>,
    outbox: Arc<Outbox>,
}

impl Refresher {
    /// Create a new refresher.
    pub fn new(
        state: Arc<AppState>,
        source: Arc<dyn WeatherSource>,
        sink: Arc<dyn NotificationSink>,
        outbox: Arc<Outbox>,
    ) -> Self {
        Self {
            state,
            source,
            sink,
            outbox,
        }
    }

    /// Start the refresh loop.
    ///
    /// Returns immediately; refreshing happens in the background until
    /// [`RefresherState::signal_stop`](crate::state::RefresherState::signal_stop)
    /// is called.
    pub fn start(&self) {
        if self.state.refresher.is_running() {
            warn!("Refresher already running");
            return;
        }
        self.state.refresher.set_running(true);

        let state = Arc::clone(&self.state);
        let source = Arc::clone(&self.source);
        let sink = Arc::clone(&self.sink);
        let outbox = Arc::clone(&self.outbox);

        tokio::spawn(async move {
            run_loop(state, source, sink, outbox).await;
        });
    }
}

async fn run_loop(
    state: Arc<AppState>,
    source: Arc<dyn WeatherSource>,
    sink: Arc<dyn NotificationSink>,
    outbox: Arc<Outbox>,
) {
    let period = StdDuration::from_secs(state.config.refresh.interval_secs);
    let mut ticker = interval(period);
    // A tick arriving mid-cycle is dropped, never queued
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stop_rx = state.refresher.subscribe_stop();

    info!(
        "Refresher started (interval: {}s)",
        state.config.refresh.interval_secs
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tick(&state, source.as_ref(), sink.as_ref(), &outbox).await;
            }
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    break;
                }
            }
        }
    }

    info!("Refresher stopped");
}

/// One full tick: refresh cycle, queue flushes, cache sweep.
pub async fn tick(
    state: &AppState,
    source: &dyn WeatherSource,
    sink: &dyn NotificationSink,
    outbox: &Outbox,
) -> CycleOutcome {
    let outcome = run_cycle(state, source, sink).await;
    state.publish(SyncEvent::CycleCompleted { outcome });

    for queue in &state.config.refresh.queues {
        let store = state.store.lock().await;
        match outbox.flush(&store, queue).await {
            Ok(report) => {
                if report.delivered > 0 || report.remaining > 0 {
                    info!(
                        "Flushed '{}': {} delivered, {} remaining",
                        queue, report.delivered, report.remaining
                    );
                }
                state.publish(SyncEvent::QueueFlushed {
                    queue: queue.clone(),
                    delivered: report.delivered,
                    remaining: report.remaining,
                });
            }
            Err(e) => warn!("Flush of '{}' failed: {}", queue, e),
        }
    }

    {
        let sweep_age = Duration::seconds(state.config.refresh.sweep_max_age_secs as i64);
        let store = state.store.lock().await;
        if let Err(e) = store.sweep_expired_snapshots(sweep_age) {
            warn!("Cache sweep failed: {}", e);
        }
    }

    outcome
}

/// One refresh cycle: location lookup, cache check, fetch, cache update,
/// throttled notification decision.
pub async fn run_cycle(
    state: &AppState,
    source: &dyn WeatherSource,
    sink: &dyn NotificationSink,
) -> CycleOutcome {
    let config = &state.config;

    let location = {
        let store = state.store.lock().await;
        match store.get_setting::<Coordinates>(keys::LAST_LOCATION) {
            Ok(location) => location,
            Err(e) => {
                // Store is advisory; treat as no location recorded
                warn!("Could not read last location: {}", e);
                None
            }
        }
    };
    let Some(coordinates) = location else {
        debug!("No last location recorded, skipping cycle");
        return CycleOutcome::NoLocation;
    };

    let now = OffsetDateTime::now_utc();
    let background_window = Duration::seconds(config.refresh.background_max_age_secs as i64);

    {
        let store = state.store.lock().await;
        match policy::resolve(
            &store,
            coordinates.latitude,
            coordinates.longitude,
            now,
            background_window,
        ) {
            Ok(Some(lookup)) if lookup.is_fresh => {
                debug!(
                    "Cached snapshot for {} still fresh, skipping fetch",
                    lookup.snapshot.location_key
                );
                return CycleOutcome::CacheFresh;
            }
            Ok(_) => {}
            Err(e) => warn!("Cache lookup failed: {}", e),
        }
    }

    let fetched = match source.fetch(&coordinates).await {
        Ok(fetched) => fetched,
        Err(e) => {
            warn!("Weather fetch failed: {}, next tick retries", e);
            return CycleOutcome::FetchFailed;
        }
    };

    let location_key = policy::location_key(coordinates.latitude, coordinates.longitude);
    let snapshot = CachedSnapshot {
        location_key: location_key.clone(),
        latitude: coordinates.latitude,
        longitude: coordinates.longitude,
        payload: fetched.payload,
        fetched_at: now,
    };
    {
        let store = state.store.lock().await;
        match store.put_snapshot(&snapshot) {
            Ok(()) => {
                state.publish(SyncEvent::SnapshotStored {
                    location_key: location_key.clone(),
                });
            }
            // The report still drives the notification decision below
            Err(e) => warn!("Failed to cache snapshot: {}", e),
        }
    }

    let last_notified_at = {
        let store = state.store.lock().await;
        store
            .get_setting::<i64>(keys::LAST_NOTIFICATION_TIME)
            .unwrap_or_else(|e| {
                warn!("Could not read last notification time: {}", e);
                None
            })
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
    };

    let notified = if notify::should_notify(&fetched.report, &config.notifications, last_notified_at, now)
    {
        let notification = notify::build_notification(&fetched.report, &location_key);
        sink.show(&notification);
        state.publish(SyncEvent::NotificationSent {
            title: notification.title.clone(),
        });

        let store = state.store.lock().await;
        if let Err(e) = store.set_setting(keys::LAST_NOTIFICATION_TIME, &now.unix_timestamp()) {
            warn!("Failed to record notification time: {}", e);
        }
        true
    } else {
        false
    };

    CycleOutcome::Updated { notified }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::notify::Notification;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stratus_store::Store;
    use stratus_sync::backend::{BackendClient, BackendError};
    use stratus_sync::weather::{FetchError, FetchedWeather};
    use stratus_types::{QueueMethod, WeatherReport};

    fn rainy_payload() -> serde_json::Value {
        json!({
            "location": { "city": "Testville" },
            "current": {
                "temp": 18.0,
                "feels_like": 17.0,
                "humidity": 70,
                "weather": { "main": "Rain", "description": "heavy rain" }
            }
        })
    }

    fn calm_payload() -> serde_json::Value {
        json!({
            "location": { "city": "Testville" },
            "current": {
                "temp": 21.0,
                "feels_like": 21.0,
                "humidity": 40,
                "weather": { "main": "Clear", "description": "clear sky" }
            }
        })
    }

    struct ScriptedSource {
        payload: Option<serde_json::Value>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn ok(payload: serde_json::Value) -> Self {
            Self {
                payload: Some(payload),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                payload: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherSource for ScriptedSource {
        async fn fetch(&self, _coordinates: &Coordinates) -> Result<FetchedWeather, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.payload {
                Some(payload) => Ok(FetchedWeather {
                    report: WeatherReport::from_payload(payload).unwrap(),
                    payload: payload.clone(),
                }),
                None => Err(FetchError::Status(502)),
            }
        }
    }

    struct RecordingSink {
        shown: Mutex<Vec<Notification>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                shown: Mutex::new(Vec::new()),
            }
        }

        fn count(&self) -> usize {
            self.shown.lock().unwrap().len()
        }
    }

    impl NotificationSink for RecordingSink {
        fn show(&self, notification: &Notification) {
            self.shown.lock().unwrap().push(notification.clone());
        }
    }

    struct OkBackend;

    #[async_trait]
    impl BackendClient for OkBackend {
        async fn deliver(
            &self,
            _queue_name: &str,
            _method: QueueMethod,
            _data: &serde_json::Value,
        ) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn state_with_location() -> Arc<AppState> {
        let store = Store::open_in_memory().unwrap();
        store
            .set_setting(keys::LAST_LOCATION, &Coordinates::new(40.7128, -74.0060))
            .unwrap();
        AppState::new(store, Config::default())
    }

    #[tokio::test]
    async fn test_cycle_skips_without_location() {
        let state = AppState::new(Store::open_in_memory().unwrap(), Config::default());
        let source = ScriptedSource::ok(calm_payload());
        let sink = RecordingSink::new();

        let outcome = run_cycle(&state, &source, &sink).await;

        assert_eq!(outcome, CycleOutcome::NoLocation);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cycle_skips_fetch_when_cache_is_fresh() {
        let state = state_with_location();
        {
            let store = state.store.lock().await;
            store
                .put_snapshot(&CachedSnapshot {
                    location_key: policy::location_key(40.7128, -74.0060),
                    latitude: 40.7128,
                    longitude: -74.0060,
                    payload: calm_payload(),
                    fetched_at: OffsetDateTime::now_utc(),
                })
                .unwrap();
        }

        let source = ScriptedSource::ok(calm_payload());
        let sink = RecordingSink::new();

        let outcome = run_cycle(&state, &source, &sink).await;

        assert_eq!(outcome, CycleOutcome::CacheFresh);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cycle_fetch_failure_is_an_outcome_not_an_error() {
        let state = state_with_location();
        let source = ScriptedSource::failing();
        let sink = RecordingSink::new();

        let outcome = run_cycle(&state, &source, &sink).await;

        assert_eq!(outcome, CycleOutcome::FetchFailed);
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn test_cycle_updates_cache_and_notifies_on_rain() {
        let state = state_with_location();
        let source = ScriptedSource::ok(rainy_payload());
        let sink = RecordingSink::new();

        let outcome = run_cycle(&state, &source, &sink).await;

        assert_eq!(outcome, CycleOutcome::Updated { notified: true });
        assert_eq!(sink.count(), 1);

        let store = state.store.lock().await;
        let key = policy::location_key(40.7128, -74.0060);
        assert!(store.get_snapshot(&key).unwrap().is_some());
        assert!(
            store
                .get_setting::<i64>(keys::LAST_NOTIFICATION_TIME)
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_cycle_updates_cache_without_notifying_on_calm_weather() {
        let state = state_with_location();
        let source = ScriptedSource::ok(calm_payload());
        let sink = RecordingSink::new();

        let outcome = run_cycle(&state, &source, &sink).await;

        assert_eq!(outcome, CycleOutcome::Updated { notified: false });
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn test_throttle_suppresses_second_cycle() {
        let state = state_with_location();
        let source = ScriptedSource::ok(rainy_payload());
        let sink = RecordingSink::new();

        // A notification 10 minutes ago is inside the 60 minute window
        let ten_minutes_ago = (OffsetDateTime::now_utc() - Duration::minutes(10)).unix_timestamp();
        {
            let store = state.store.lock().await;
            store
                .set_setting(keys::LAST_NOTIFICATION_TIME, &ten_minutes_ago)
                .unwrap();
        }

        let outcome = run_cycle(&state, &source, &sink).await;

        // Cache is still updated; only the notification is suppressed
        assert_eq!(outcome, CycleOutcome::Updated { notified: false });
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn test_throttle_allows_after_window_elapses() {
        let state = state_with_location();
        let source = ScriptedSource::ok(rainy_payload());
        let sink = RecordingSink::new();

        let an_hour_ago = (OffsetDateTime::now_utc() - Duration::minutes(61)).unix_timestamp();
        {
            let store = state.store.lock().await;
            store
                .set_setting(keys::LAST_NOTIFICATION_TIME, &an_hour_ago)
                .unwrap();
        }

        let outcome = run_cycle(&state, &source, &sink).await;

        assert_eq!(outcome, CycleOutcome::Updated { notified: true });
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test]
    async fn test_tick_flushes_configured_queues() {
        let state = state_with_location();
        {
            let store = state.store.lock().await;
            store
                .enqueue("favorites", QueueMethod::Create, &json!({"lat": 1.0, "lon": 2.0}))
                .unwrap();
        }

        let source = ScriptedSource::ok(calm_payload());
        let sink = RecordingSink::new();
        let outbox = Outbox::new(Box::new(OkBackend));

        let mut events = state.events_tx.subscribe();
        tick(&state, &source, &sink, &outbox).await;

        let store = state.store.lock().await;
        assert_eq!(store.count_queued("favorites").unwrap(), 0);
        drop(store);

        // CycleCompleted comes first, then one QueueFlushed per queue
        let mut saw_flush = false;
        while let Ok(event) = events.try_recv() {
            if let SyncEvent::QueueFlushed { queue, delivered, .. } = event {
                if queue == "favorites" {
                    assert_eq!(delivered, 1);
                    saw_flush = true;
                }
            }
        }
        assert!(saw_flush);
    }

    #[tokio::test]
    async fn test_tick_sweeps_expired_snapshots() {
        let state = state_with_location();
        {
            let store = state.store.lock().await;
            store
                .put_snapshot(&CachedSnapshot {
                    location_key: "1.00,1.00".to_string(),
                    latitude: 1.0,
                    longitude: 1.0,
                    payload: json!({}),
                    fetched_at: OffsetDateTime::now_utc() - Duration::days(8),
                })
                .unwrap();
        }

        let source = ScriptedSource::ok(calm_payload());
        let sink = RecordingSink::new();
        let outbox = Outbox::new(Box::new(OkBackend));

        tick(&state, &source, &sink, &outbox).await;

        let store = state.store.lock().await;
        assert!(store.get_snapshot("1.00,1.00").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresher_start_and_stop() {
        let state = state_with_location();
        let refresher = Refresher::new(
            Arc::clone(&state),
            Arc::new(ScriptedSource::ok(calm_payload())),
            Arc::new(RecordingSink::new()),
            Arc::new(Outbox::new(Box::new(OkBackend))),
        );

        refresher.start();
        assert!(state.refresher.is_running());

        // The first tick fires immediately; give it a moment to land
        tokio::time::sleep(StdDuration::from_millis(50)).await;

        state.refresher.signal_stop();
        assert!(!state.refresher.is_running());
    }
}
