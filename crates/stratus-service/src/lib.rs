//! Periodic refresh daemon for the Stratus offline weather sync core.
//!
//! This crate provides a service that:
//! - Refreshes weather for the last known location on a fixed interval
//! - Flushes the sync queues whenever a cycle runs
//! - Sweeps aged-out cache entries
//! - Dispatches throttled weather notifications
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/stratus/service.toml`:
//!
//! ```toml
//! [storage]
//! path = "~/.local/share/stratus/data.db"
//!
//! [refresh]
//! interval_secs = 3600
//! queues = ["favorites", "preferences"]
//!
//! [notifications]
//! throttle_secs = 3600
//! significant_conditions = ["Rain", "Thunderstorm", "Snow", "Drizzle", "Extreme"]
//! high_temp_c = 35.0
//! low_temp_c = 0.0
//! high_humidity_pct = 85
//!
//! [weather]
//! endpoint = "https://weather.example.com"
//!
//! [backend]
//! endpoint = "https://api.example.com"
//! ```
//!
//! # Notifications
//!
//! Notifications go to the service log by default; build with the
//! `desktop-notifications` feature to raise desktop notifications instead.

pub mod config;
pub mod notify;
pub mod refresher;
pub mod state;

pub use config::{Config, ConfigError};
pub use notify::{LogSink, Notification, NotificationSink};
pub use refresher::{CycleOutcome, Refresher};
pub use state::{AppState, SyncEvent};

#[cfg(feature = "desktop-notifications")]
pub use notify::DesktopSink;

/// Well-known settings keys.
pub mod keys {
    /// The last known location (`stratus_types::Coordinates`).
    pub const LAST_LOCATION: &str = "last_location";
    /// Unix timestamp of the last dispatched notification.
    pub const LAST_NOTIFICATION_TIME: &str = "last_notification_time";
}
