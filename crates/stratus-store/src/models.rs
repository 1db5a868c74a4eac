//! Data models for stored data.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use stratus_types::QueueMethod;

/// A cached weather snapshot.
///
/// The payload is the provider response stored verbatim; consumers project
/// it into typed reports when needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSnapshot {
    /// Rounded-coordinate cache key, e.g. `"40.71,-74.01"`.
    pub location_key: String,
    /// Latitude the payload was fetched for.
    pub latitude: f64,
    /// Longitude the payload was fetched for.
    pub longitude: f64,
    /// Opaque provider payload.
    pub payload: serde_json::Value,
    /// When the payload was fetched.
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
}

/// A favorite location stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFavorite {
    /// Database row ID.
    pub id: i64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Display name.
    pub label: String,
    /// When the favorite was pinned.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A pending backend mutation stored in the sync queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedAction {
    /// Database row ID, monotonically increasing.
    pub id: i64,
    /// Queue category, e.g. `"favorites"` or `"preferences"`.
    pub queue_name: String,
    /// Replay semantics.
    pub method: QueueMethod,
    /// Payload to resend.
    pub data: serde_json::Value,
    /// When the action was queued.
    #[serde(with = "time::serde::rfc3339")]
    pub enqueued_at: OffsetDateTime,
}

/// Outcome of [`Store::add_favorite`](crate::Store::add_favorite).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new favorite was stored under this ID.
    Added(i64),
    /// A favorite with the exact same coordinates already exists; nothing
    /// was written.
    Duplicate,
}

impl AddOutcome {
    /// The new row ID, if one was created.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Added(id) => Some(*id),
            Self::Duplicate => None,
        }
    }
}

/// Summary statistics over the weather cache.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Number of cached snapshots.
    pub entries: u64,
    /// Fetch time of the oldest snapshot.
    #[serde(with = "time::serde::rfc3339::option")]
    pub oldest_fetched_at: Option<OffsetDateTime>,
    /// Fetch time of the newest snapshot.
    #[serde(with = "time::serde::rfc3339::option")]
    pub newest_fetched_at: Option<OffsetDateTime>,
}
