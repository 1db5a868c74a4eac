//! Core types for the offline weather sync core.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ParseError, ParseResult};

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees, -90.0..=90.0.
    pub latitude: f64,
    /// Longitude in decimal degrees, -180.0..=180.0.
    pub longitude: f64,
}

impl Coordinates {
    /// Create a new coordinate pair.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and within geographic bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }
}

/// Weather condition category as reported by a provider.
///
/// Categories follow the coarse `weather.main` taxonomy most HTTP providers
/// use. Unrecognized categories map to [`WeatherCondition::Unknown`] rather
/// than failing, so a provider adding new categories does not break cached
/// payload projection.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new categories
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum WeatherCondition {
    /// Clear sky.
    Clear,
    /// Cloud cover.
    Clouds,
    /// Light precipitation.
    Drizzle,
    /// Rain.
    Rain,
    /// Thunderstorm.
    Thunderstorm,
    /// Snow.
    Snow,
    /// Mist, fog, or haze.
    Fog,
    /// Tornado, squall, or other extreme event.
    Extreme,
    /// Category not recognized.
    Unknown,
}

impl WeatherCondition {
    /// Parse a provider category string (case-insensitive).
    ///
    /// # Examples
    ///
    /// ```
    /// use stratus_types::WeatherCondition;
    ///
    /// assert_eq!(WeatherCondition::from_category("Rain"), WeatherCondition::Rain);
    /// assert_eq!(WeatherCondition::from_category("thunderstorm"), WeatherCondition::Thunderstorm);
    /// assert_eq!(WeatherCondition::from_category("Haze"), WeatherCondition::Fog);
    /// assert_eq!(WeatherCondition::from_category("plasma storm"), WeatherCondition::Unknown);
    /// ```
    #[must_use]
    pub fn from_category(category: &str) -> Self {
        match category.trim().to_ascii_lowercase().as_str() {
            "clear" => Self::Clear,
            "clouds" | "cloudy" => Self::Clouds,
            "drizzle" => Self::Drizzle,
            "rain" => Self::Rain,
            "thunderstorm" => Self::Thunderstorm,
            "snow" => Self::Snow,
            "mist" | "fog" | "haze" => Self::Fog,
            "extreme" => Self::Extreme,
            _ => Self::Unknown,
        }
    }

    /// Canonical category name.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::Clouds => "Clouds",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::Thunderstorm => "Thunderstorm",
            Self::Snow => "Snow",
            Self::Fog => "Fog",
            Self::Extreme => "Extreme",
            Self::Unknown => "Unknown",
        }
    }
}

/// Typed projection of a weather provider payload.
///
/// The raw payload is cached opaquely; this projection carries only the
/// fields the notification criteria and display surfaces need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    /// Air temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Apparent temperature in degrees Celsius.
    pub feels_like_c: f64,
    /// Relative humidity percentage, 0..=100.
    pub humidity: u8,
    /// Condition category.
    pub condition: WeatherCondition,
    /// Human-readable condition description.
    pub description: String,
    /// Resolved place name, when the provider includes one.
    pub city: Option<String>,
    /// Provider-side observation time, when included.
    #[serde(with = "time::serde::rfc3339::option")]
    pub observed_at: Option<OffsetDateTime>,
}

impl WeatherReport {
    /// Project a provider payload into a typed report.
    ///
    /// Expects the compact widget shape:
    ///
    /// ```json
    /// {
    ///   "location": { "city": "New York" },
    ///   "current": {
    ///     "temp": 20.5,
    ///     "feels_like": 19.0,
    ///     "humidity": 45,
    ///     "dt": 1700000000,
    ///     "weather": { "main": "Rain", "description": "light rain" }
    ///   }
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when a required field is missing or malformed.
    pub fn from_payload(payload: &serde_json::Value) -> ParseResult<Self> {
        let current = payload
            .get("current")
            .ok_or(ParseError::MissingField("current"))?;

        let temperature_c = current
            .get("temp")
            .and_then(serde_json::Value::as_f64)
            .ok_or(ParseError::MissingField("current.temp"))?;

        let feels_like_c = current
            .get("feels_like")
            .and_then(serde_json::Value::as_f64)
            .ok_or(ParseError::MissingField("current.feels_like"))?;

        let humidity = current
            .get("humidity")
            .and_then(serde_json::Value::as_u64)
            .ok_or(ParseError::MissingField("current.humidity"))?;
        if humidity > 100 {
            return Err(ParseError::InvalidValue {
                field: "current.humidity",
                message: format!("{humidity} is not a percentage"),
            });
        }

        let weather = current
            .get("weather")
            .ok_or(ParseError::MissingField("current.weather"))?;
        let category = weather
            .get("main")
            .and_then(serde_json::Value::as_str)
            .ok_or(ParseError::MissingField("current.weather.main"))?;
        let description = weather
            .get("description")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(category)
            .to_string();

        let city = payload
            .get("location")
            .and_then(|l| l.get("city"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);

        let observed_at = current
            .get("dt")
            .and_then(serde_json::Value::as_i64)
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok());

        Ok(Self {
            temperature_c,
            feels_like_c,
            humidity: humidity as u8,
            condition: WeatherCondition::from_category(category),
            description,
            city,
            observed_at,
        })
    }
}

/// Replay semantics for a queued backend mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueMethod {
    /// Create a remote resource (replayed as POST).
    Create,
    /// Update a remote resource (replayed as PUT).
    Update,
    /// Delete a remote resource (replayed as DELETE).
    Delete,
}

impl QueueMethod {
    /// Stable string form used for persistence.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::str::FromStr for QueueMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(ParseError::UnknownMethod(other.to_string())),
        }
    }
}

impl std::fmt::Display for QueueMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
