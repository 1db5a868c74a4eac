//! Local data persistence for the Stratus offline weather sync core.
//!
//! This crate provides SQLite-based storage for the four offline
//! collections: cached weather snapshots, favorite locations, settings,
//! and the sync queue.
//!
//! # Features
//!
//! - Replace-on-key snapshot writes (one live snapshot per location key)
//! - Favorite dedup on exact coordinates, surfaced as a sentinel
//! - Named JSON preference values with typed accessors
//! - FIFO sync queue with idempotent removal
//! - Expiry sweep for aged-out snapshots
//!
//! # Example
//!
//! ```no_run
//! use stratus_store::{AddOutcome, Store};
//!
//! let store = Store::open_default()?;
//!
//! match store.add_favorite(40.7128, -74.0060, "New York")? {
//!     AddOutcome::Added(id) => println!("pinned as {id}"),
//!     AddOutcome::Duplicate => println!("already pinned"),
//! }
//! # Ok::<(), stratus_store::Error>(())
//! ```
//!
//! The store is an advisory cache: callers must degrade gracefully when it
//! is unavailable, never crash.

mod error;
mod models;
mod schema;
mod store;

pub use error::{Error, Result};
pub use models::{AddOutcome, CacheStats, CachedSnapshot, QueuedAction, StoredFavorite};
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/stratus/data.db`
/// - macOS: `~/Library/Application Support/stratus/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\stratus\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("stratus")
        .join("data.db")
}
