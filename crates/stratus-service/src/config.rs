//! Service configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage settings.
    pub storage: StorageConfig,
    /// Refresh scheduling settings.
    pub refresh: RefreshConfig,
    /// Notification criteria and throttling.
    pub notifications: NotificationsConfig,
    /// Weather provider settings.
    pub weather: WeatherConfig,
    /// Backend mutation endpoint settings.
    pub backend: BackendConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        // Create parent directories if needed
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Storage path is not empty
    /// - Refresh interval and freshness windows are within reasonable bounds
    /// - Queue names are non-empty and unique
    /// - Notification thresholds are coherent
    /// - Endpoints look like HTTP URLs
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.storage.validate());
        errors.extend(self.refresh.validate());
        errors.extend(self.notifications.validate());
        errors.extend(self.weather.validate("weather"));
        errors.extend(self.backend.validate("backend"));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    ///
    /// This is a convenience method that combines `load()` and `validate()`.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: stratus_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "database path cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// Minimum refresh interval in seconds (1 minute).
pub const MIN_REFRESH_INTERVAL: u64 = 60;
/// Maximum refresh interval in seconds (24 hours).
pub const MAX_REFRESH_INTERVAL: u64 = 86_400;

/// Refresh scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between refresh cycles.
    pub interval_secs: u64,
    /// Freshness window for background cycles; a cached snapshot younger
    /// than this skips the network fetch entirely.
    pub background_max_age_secs: u64,
    /// Freshness window for interactive display.
    pub cache_max_age_secs: u64,
    /// Age past which the sweep deletes cached snapshots.
    pub sweep_max_age_secs: u64,
    /// Queues flushed on every cycle.
    pub queues: Vec<String>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            background_max_age_secs: 3600,
            cache_max_age_secs: 86_400,
            sweep_max_age_secs: 604_800,
            queues: vec!["favorites".to_string(), "preferences".to_string()],
        }
    }
}

impl RefreshConfig {
    /// Validate refresh configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.interval_secs < MIN_REFRESH_INTERVAL {
            errors.push(ValidationError {
                field: "refresh.interval_secs".to_string(),
                message: format!(
                    "interval {} is too short (minimum {} seconds)",
                    self.interval_secs, MIN_REFRESH_INTERVAL
                ),
            });
        } else if self.interval_secs > MAX_REFRESH_INTERVAL {
            errors.push(ValidationError {
                field: "refresh.interval_secs".to_string(),
                message: format!(
                    "interval {} is too long (maximum {} seconds / 24 hours)",
                    self.interval_secs, MAX_REFRESH_INTERVAL
                ),
            });
        }

        for (name, value) in [
            ("refresh.background_max_age_secs", self.background_max_age_secs),
            ("refresh.cache_max_age_secs", self.cache_max_age_secs),
            ("refresh.sweep_max_age_secs", self.sweep_max_age_secs),
        ] {
            if value == 0 {
                errors.push(ValidationError {
                    field: name.to_string(),
                    message: "freshness window cannot be zero".to_string(),
                });
            }
        }

        if self.sweep_max_age_secs < self.cache_max_age_secs {
            errors.push(ValidationError {
                field: "refresh.sweep_max_age_secs".to_string(),
                message: "sweep age must not be shorter than the display freshness window"
                    .to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for (i, queue) in self.queues.iter().enumerate() {
            if queue.is_empty() {
                errors.push(ValidationError {
                    field: format!("refresh.queues[{}]", i),
                    message: "queue name cannot be empty".to_string(),
                });
            } else if !seen.insert(queue.clone()) {
                errors.push(ValidationError {
                    field: format!("refresh.queues[{}]", i),
                    message: format!("duplicate queue name '{}'", queue),
                });
            }
        }

        errors
    }
}

/// Notification criteria and throttling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Minimum seconds between two notifications.
    pub throttle_secs: u64,
    /// Condition categories that always warrant a notification.
    pub significant_conditions: Vec<String>,
    /// Notify when temperature rises above this (Celsius).
    pub high_temp_c: f64,
    /// Notify when temperature falls below this (Celsius).
    pub low_temp_c: f64,
    /// Notify when humidity rises above this percentage.
    pub high_humidity_pct: u8,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            throttle_secs: 3600,
            significant_conditions: vec![
                "Rain".to_string(),
                "Thunderstorm".to_string(),
                "Snow".to_string(),
                "Drizzle".to_string(),
                "Extreme".to_string(),
            ],
            high_temp_c: 35.0,
            low_temp_c: 0.0,
            high_humidity_pct: 85,
        }
    }
}

impl NotificationsConfig {
    /// Validate notification configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.high_temp_c <= self.low_temp_c {
            errors.push(ValidationError {
                field: "notifications.high_temp_c".to_string(),
                message: format!(
                    "high threshold {} must be above low threshold {}",
                    self.high_temp_c, self.low_temp_c
                ),
            });
        }

        if self.high_humidity_pct > 100 {
            errors.push(ValidationError {
                field: "notifications.high_humidity_pct".to_string(),
                message: format!("{} is not a percentage", self.high_humidity_pct),
            });
        }

        for (i, condition) in self.significant_conditions.iter().enumerate() {
            if condition.is_empty() {
                errors.push(ValidationError {
                    field: format!("notifications.significant_conditions[{}]", i),
                    message: "condition category cannot be empty".to_string(),
                });
            }
        }

        errors
    }
}

/// Weather provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Provider base URL.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Backend mutation endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend base URL.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Shared validation for endpoint-shaped sections.
trait EndpointSection {
    fn endpoint(&self) -> &str;
    fn timeout_secs(&self) -> u64;

    fn validate(&self, prefix: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.endpoint().is_empty() {
            errors.push(ValidationError {
                field: format!("{}.endpoint", prefix),
                message: "endpoint cannot be empty".to_string(),
            });
        } else if !self.endpoint().starts_with("http://") && !self.endpoint().starts_with("https://")
        {
            errors.push(ValidationError {
                field: format!("{}.endpoint", prefix),
                message: format!("endpoint '{}' must be an http(s) URL", self.endpoint()),
            });
        }

        if self.timeout_secs() == 0 {
            errors.push(ValidationError {
                field: format!("{}.timeout_secs", prefix),
                message: "timeout cannot be zero".to_string(),
            });
        }

        errors
    }
}

impl EndpointSection for WeatherConfig {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }
    fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

impl EndpointSection for BackendConfig {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }
    fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `refresh.interval_secs`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stratus")
        .join("service.toml")
}
