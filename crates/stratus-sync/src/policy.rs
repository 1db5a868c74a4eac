//! Cache policy: location keys and freshness decisions.
//!
//! Interactive code paths render a stale-but-present snapshot immediately
//! and trigger a refresh in the background; staleness is therefore always
//! reported alongside the data, never hidden.

use time::{Duration, OffsetDateTime};

use stratus_store::{CachedSnapshot, Store};

/// Freshness window for interactive display.
pub const INTERACTIVE_MAX_AGE: Duration = Duration::hours(24);

/// Freshness window for background refresh cycles.
pub const BACKGROUND_MAX_AGE: Duration = Duration::hours(1);

/// Age past which the sweep removes snapshots outright.
pub const SWEEP_MAX_AGE: Duration = Duration::days(7);

/// Derive the cache key for a coordinate pair.
///
/// Coordinates are rounded to two decimal places (roughly 1 km), so nearby
/// repeated lookups hit the same entry. Negative zero is normalized: values
/// either side of a meridian round to the same key.
///
/// # Examples
///
/// ```
/// use stratus_sync::policy::location_key;
///
/// assert_eq!(location_key(40.7128, -74.0060), "40.71,-74.01");
/// assert_eq!(location_key(-0.001, 0.001), "0.00,0.00");
/// ```
#[must_use]
pub fn location_key(latitude: f64, longitude: f64) -> String {
    format!("{:.2},{:.2}", round2(latitude), round2(longitude))
}

fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // -0.0 and 0.0 must share a key
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Whether a snapshot is young enough to serve without a network round-trip.
///
/// The comparison is inclusive: a snapshot exactly `max_age` old is still
/// fresh. A snapshot with a future `fetched_at` (clock skew) counts as fresh.
#[must_use]
pub fn is_fresh(snapshot: &CachedSnapshot, now: OffsetDateTime, max_age: Duration) -> bool {
    now - snapshot.fetched_at <= max_age
}

/// A cache lookup result with its freshness verdict.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    /// The cached snapshot, possibly stale.
    pub snapshot: CachedSnapshot,
    /// Whether the snapshot falls within the requested freshness window.
    pub is_fresh: bool,
}

/// Look up the cached snapshot for a coordinate pair.
///
/// Returns `None` when nothing is cached for the derived key. Stale entries
/// are returned with `is_fresh == false`, never suppressed.
///
/// # Errors
///
/// Propagates store failures; callers treat the store as advisory and fall
/// back to a live fetch.
pub fn resolve(
    store: &Store,
    latitude: f64,
    longitude: f64,
    now: OffsetDateTime,
    max_age: Duration,
) -> stratus_store::Result<Option<CacheLookup>> {
    let key = location_key(latitude, longitude);
    Ok(store.get_snapshot(&key)?.map(|snapshot| {
        let is_fresh = is_fresh(&snapshot, now, max_age);
        CacheLookup { snapshot, is_fresh }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot_at(key: &str, fetched_at: OffsetDateTime) -> CachedSnapshot {
        CachedSnapshot {
            location_key: key.to_string(),
            latitude: 40.71,
            longitude: -74.01,
            payload: json!({"temp": 20}),
            fetched_at,
        }
    }

    #[test]
    fn test_location_key_rounding() {
        assert_eq!(location_key(40.7128, -74.0060), "40.71,-74.01");
        assert_eq!(location_key(51.5074, -0.1278), "51.51,-0.13");
        assert_eq!(location_key(0.0, 0.0), "0.00,0.00");
    }

    #[test]
    fn test_location_key_nearby_lookups_share_entry() {
        assert_eq!(location_key(40.714, -74.009), location_key(40.706, -74.013));
    }

    #[test]
    fn test_location_key_negative_zero() {
        assert_eq!(location_key(-0.001, 0.001), "0.00,0.00");
        assert_eq!(location_key(0.001, -0.001), "0.00,0.00");
    }

    #[test]
    fn test_is_fresh_within_window() {
        let now = OffsetDateTime::now_utc();
        let snap = snapshot_at("40.71,-74.01", now - Duration::minutes(1));
        assert!(is_fresh(&snap, now, Duration::hours(24)));
    }

    #[test]
    fn test_is_fresh_boundary_inclusive() {
        let now = OffsetDateTime::now_utc();
        let snap = snapshot_at("40.71,-74.01", now - Duration::hours(24));
        assert!(is_fresh(&snap, now, Duration::hours(24)));
        assert!(!is_fresh(&snap, now + Duration::seconds(1), Duration::hours(24)));
    }

    #[test]
    fn test_is_fresh_expired() {
        let now = OffsetDateTime::now_utc();
        let snap = snapshot_at("40.71,-74.01", now - Duration::hours(25));
        assert!(!is_fresh(&snap, now, Duration::hours(24)));
        // Still fresh under a wider window
        assert!(is_fresh(&snap, now, Duration::days(7)));
    }

    #[test]
    fn test_is_fresh_future_timestamp() {
        let now = OffsetDateTime::now_utc();
        let snap = snapshot_at("40.71,-74.01", now + Duration::minutes(5));
        assert!(is_fresh(&snap, now, Duration::hours(1)));
    }

    #[test]
    fn test_resolve_absent() {
        let store = Store::open_in_memory().unwrap();
        let lookup = resolve(&store, 40.7128, -74.0060, OffsetDateTime::now_utc(), INTERACTIVE_MAX_AGE)
            .unwrap();
        assert!(lookup.is_none());
    }

    #[test]
    fn test_resolve_fresh_hit() {
        let store = Store::open_in_memory().unwrap();
        let now = OffsetDateTime::now_utc();
        store
            .put_snapshot(&snapshot_at("40.71,-74.01", now - Duration::minutes(1)))
            .unwrap();

        let lookup = resolve(&store, 40.7128, -74.0060, now, INTERACTIVE_MAX_AGE)
            .unwrap()
            .unwrap();
        assert!(lookup.is_fresh);
        assert_eq!(lookup.snapshot.payload, json!({"temp": 20}));
    }

    #[test]
    fn test_resolve_stale_but_present() {
        let store = Store::open_in_memory().unwrap();
        let now = OffsetDateTime::now_utc();
        store
            .put_snapshot(&snapshot_at("40.71,-74.01", now - Duration::hours(26)))
            .unwrap();

        let lookup = resolve(&store, 40.7128, -74.0060, now, INTERACTIVE_MAX_AGE)
            .unwrap()
            .unwrap();
        assert!(!lookup.is_fresh);
        assert_eq!(lookup.snapshot.payload, json!({"temp": 20}));
    }
}
