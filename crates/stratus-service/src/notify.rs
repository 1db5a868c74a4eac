//! Notification criteria and delivery sinks.

use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use stratus_types::{WeatherCondition, WeatherReport};

use crate::config::NotificationsConfig;

/// A notification ready for delivery.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Short headline, e.g. `"20°C in New York"`.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Structured context for sinks that can carry it.
    pub metadata: serde_json::Value,
}

/// A platform notification capability. Delivery is fire-and-forget; sinks
/// absorb their own failures.
pub trait NotificationSink: Send + Sync {
    /// Surface a notification to the user.
    fn show(&self, notification: &Notification);
}

/// Sink that records notifications in the service log.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn show(&self, notification: &Notification) {
        info!("Notification: {} - {}", notification.title, notification.body);
    }
}

/// Sink that raises desktop notifications.
#[cfg(feature = "desktop-notifications")]
pub struct DesktopSink;

#[cfg(feature = "desktop-notifications")]
impl NotificationSink for DesktopSink {
    fn show(&self, notification: &Notification) {
        let result = notify_rust::Notification::new()
            .summary(&notification.title)
            .body(&notification.body)
            .appname("stratus")
            .show();

        match result {
            Ok(_) => debug!("Desktop notification sent: {}", notification.title),
            Err(e) => tracing::warn!("Failed to show desktop notification: {}", e),
        }
    }
}

/// Decide whether a fetched report warrants alerting the user.
///
/// At most one notification per rolling throttle window; a report that
/// would notify inside the window is suppressed. Outside the window, any
/// of the following triggers (logical OR):
///
/// - the condition category is in the configured significant set
/// - temperature above the high threshold or below the low threshold
/// - humidity above the high threshold
#[must_use]
pub fn should_notify(
    report: &WeatherReport,
    config: &NotificationsConfig,
    last_notified_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> bool {
    if let Some(last) = last_notified_at {
        let throttle = Duration::seconds(config.throttle_secs as i64);
        if now - last < throttle {
            debug!("Notification suppressed by throttle window");
            return false;
        }
    }

    let significant = report.condition != WeatherCondition::Unknown
        && config
            .significant_conditions
            .iter()
            .any(|c| WeatherCondition::from_category(c) == report.condition);

    significant
        || report.temperature_c > config.high_temp_c
        || report.temperature_c < config.low_temp_c
        || report.humidity > config.high_humidity_pct
}

/// Build the user-facing notification for a report.
#[must_use]
pub fn build_notification(report: &WeatherReport, location_key: &str) -> Notification {
    let place = report.city.as_deref().unwrap_or(location_key);
    Notification {
        title: format!("{:.0}°C in {}", report.temperature_c, place),
        body: format!(
            "{}. Feels like {:.0}°C",
            report.description, report.feels_like_c
        ),
        metadata: serde_json::json!({
            "location_key": location_key,
            "condition": report.condition.category(),
            "temperature_c": report.temperature_c,
            "humidity": report.humidity,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(condition: WeatherCondition, temp: f64, humidity: u8) -> WeatherReport {
        WeatherReport {
            temperature_c: temp,
            feels_like_c: temp - 1.0,
            humidity,
            condition,
            description: condition.category().to_lowercase(),
            city: Some("Testville".to_string()),
            observed_at: None,
        }
    }

    fn config() -> NotificationsConfig {
        NotificationsConfig::default()
    }

    #[test]
    fn test_calm_weather_does_not_notify() {
        let now = OffsetDateTime::now_utc();
        let r = report(WeatherCondition::Clear, 20.0, 50);
        assert!(!should_notify(&r, &config(), None, now));
    }

    #[test]
    fn test_significant_condition_notifies() {
        let now = OffsetDateTime::now_utc();
        for condition in [
            WeatherCondition::Rain,
            WeatherCondition::Thunderstorm,
            WeatherCondition::Snow,
            WeatherCondition::Drizzle,
            WeatherCondition::Extreme,
        ] {
            let r = report(condition, 20.0, 50);
            assert!(should_notify(&r, &config(), None, now), "{:?}", condition);
        }
    }

    #[test]
    fn test_condition_matching_is_case_insensitive() {
        let now = OffsetDateTime::now_utc();
        let mut cfg = config();
        cfg.significant_conditions = vec!["rain".to_string()];

        let r = report(WeatherCondition::Rain, 20.0, 50);
        assert!(should_notify(&r, &cfg, None, now));
    }

    #[test]
    fn test_unknown_condition_never_matches_significant_set() {
        let now = OffsetDateTime::now_utc();
        let mut cfg = config();
        cfg.significant_conditions = vec!["definitely not a category".to_string()];

        let r = report(WeatherCondition::Unknown, 20.0, 50);
        assert!(!should_notify(&r, &cfg, None, now));
    }

    #[test]
    fn test_temperature_thresholds() {
        let now = OffsetDateTime::now_utc();
        let cfg = config();

        assert!(should_notify(&report(WeatherCondition::Clear, 35.5, 50), &cfg, None, now));
        assert!(should_notify(&report(WeatherCondition::Clear, -0.5, 50), &cfg, None, now));
        // Boundary values do not trigger
        assert!(!should_notify(&report(WeatherCondition::Clear, 35.0, 50), &cfg, None, now));
        assert!(!should_notify(&report(WeatherCondition::Clear, 0.0, 50), &cfg, None, now));
    }

    #[test]
    fn test_humidity_threshold() {
        let now = OffsetDateTime::now_utc();
        let cfg = config();

        assert!(should_notify(&report(WeatherCondition::Clear, 20.0, 86), &cfg, None, now));
        assert!(!should_notify(&report(WeatherCondition::Clear, 20.0, 85), &cfg, None, now));
    }

    #[test]
    fn test_throttle_suppresses_within_window() {
        let now = OffsetDateTime::now_utc();
        let r = report(WeatherCondition::Rain, 20.0, 50);

        let last = now - Duration::minutes(10);
        assert!(!should_notify(&r, &config(), Some(last), now));
    }

    #[test]
    fn test_throttle_allows_after_window() {
        let now = OffsetDateTime::now_utc();
        let r = report(WeatherCondition::Rain, 20.0, 50);

        let last = now - Duration::minutes(61);
        assert!(should_notify(&r, &config(), Some(last), now));
    }

    #[test]
    fn test_throttle_suppresses_even_extreme_weather() {
        let now = OffsetDateTime::now_utc();
        let r = report(WeatherCondition::Extreme, 40.0, 95);

        let last = now - Duration::minutes(1);
        assert!(!should_notify(&r, &config(), Some(last), now));
    }

    #[test]
    fn test_build_notification_uses_city() {
        let r = report(WeatherCondition::Rain, 19.6, 70);
        let n = build_notification(&r, "40.71,-74.01");

        assert_eq!(n.title, "20°C in Testville");
        assert!(n.body.contains("Feels like 19°C"));
        assert_eq!(n.metadata["condition"], "Rain");
    }

    #[test]
    fn test_build_notification_falls_back_to_key() {
        let mut r = report(WeatherCondition::Clear, 20.0, 50);
        r.city = None;

        let n = build_notification(&r, "40.71,-74.01");
        assert!(n.title.contains("40.71,-74.01"));
    }
}
