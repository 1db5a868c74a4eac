//! End-to-end offline flow: store + cache policy + outbox working together.

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use time::{Duration, OffsetDateTime};

use stratus_store::{CachedSnapshot, Store};
use stratus_sync::backend::{BackendClient, BackendError};
use stratus_sync::{Outbox, SubmitOutcome, policy};
use stratus_types::QueueMethod;

struct OfflineBackend;

#[async_trait]
impl BackendClient for OfflineBackend {
    async fn deliver(
        &self,
        _queue_name: &str,
        _method: QueueMethod,
        _data: &serde_json::Value,
    ) -> Result<(), BackendError> {
        Err(BackendError::Status(503))
    }
}

struct OnlineBackend {
    seen: Arc<Mutex<Vec<serde_json::Value>>>,
}

#[async_trait]
impl BackendClient for OnlineBackend {
    async fn deliver(
        &self,
        _queue_name: &str,
        _method: QueueMethod,
        data: &serde_json::Value,
    ) -> Result<(), BackendError> {
        self.seen.lock().unwrap().push(data.clone());
        Ok(())
    }
}

fn put_at(store: &Store, lat: f64, lon: f64, payload: serde_json::Value, fetched_at: OffsetDateTime) {
    store
        .put_snapshot(&CachedSnapshot {
            location_key: policy::location_key(lat, lon),
            latitude: lat,
            longitude: lon,
            payload,
            fetched_at,
        })
        .unwrap();
}

#[test]
fn cached_snapshot_is_fresh_within_a_day() {
    let store = Store::open_in_memory().unwrap();
    let fetched_at = OffsetDateTime::from_unix_timestamp(1_000).unwrap();
    put_at(&store, 40.7128, -74.0060, json!({"temp": 20}), fetched_at);

    let now = fetched_at + Duration::seconds(60);
    let lookup = policy::resolve(&store, 40.7128, -74.0060, now, Duration::hours(24))
        .unwrap()
        .unwrap();

    assert!(lookup.is_fresh);
    assert_eq!(lookup.snapshot.payload, json!({"temp": 20}));
}

#[test]
fn expired_snapshot_is_returned_stale() {
    let store = Store::open_in_memory().unwrap();
    let fetched_at = OffsetDateTime::from_unix_timestamp(1_000).unwrap();
    put_at(&store, 40.7128, -74.0060, json!({"temp": 20}), fetched_at);

    // Just past the 24 hour window
    let now = fetched_at + Duration::seconds(90_000);
    let lookup = policy::resolve(&store, 40.7128, -74.0060, now, Duration::hours(24))
        .unwrap()
        .unwrap();

    assert!(!lookup.is_fresh);
    assert_eq!(lookup.snapshot.payload, json!({"temp": 20}));
}

#[tokio::test]
async fn offline_submit_queues_then_flush_drains_when_back_online() {
    let store = Store::open_in_memory().unwrap();

    // Backend down: the mutation lands in the queue, not in an error
    let outbox = Outbox::new(Box::new(OfflineBackend));
    let outcome = outbox
        .submit(&store, "favorites", QueueMethod::Create, json!({"lat": 10, "lon": 20}))
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Queued(_)));

    let queued = store.list_queued("favorites").unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].data, json!({"lat": 10, "lon": 20}));

    // Connectivity restored: a flush replays the queued mutation
    let seen = Arc::new(Mutex::new(Vec::new()));
    let outbox = Outbox::new(Box::new(OnlineBackend { seen: Arc::clone(&seen) }));
    let report = outbox.flush(&store, "favorites").await.unwrap();

    assert_eq!(report.delivered, 1);
    assert_eq!(report.remaining, 0);
    assert_eq!(store.count_queued("favorites").unwrap(), 0);
    assert_eq!(*seen.lock().unwrap(), vec![json!({"lat": 10, "lon": 20})]);
}

#[tokio::test]
async fn replayed_actions_keep_their_submit_order() {
    let store = Store::open_in_memory().unwrap();
    let outbox = Outbox::new(Box::new(OfflineBackend));

    for seq in 1..=3 {
        outbox
            .submit(&store, "preferences", QueueMethod::Update, json!({"seq": seq}))
            .await
            .unwrap();
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let outbox = Outbox::new(Box::new(OnlineBackend { seen: Arc::clone(&seen) }));
    outbox.flush(&store, "preferences").await.unwrap();

    let seqs: Vec<i64> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|d| d["seq"].as_i64().unwrap())
        .collect();
    assert_eq!(seqs, vec![1, 2, 3]);
}
