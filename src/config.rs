//! Configuration stored as TOML in the user's config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ClimaError;
use crate::owm;
use crate::units::temperature::c2f;

/// Environment variable that overrides the configured API key
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Temperature unit used for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn toggle(self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Celsius,
        }
    }

    /// Formats a Celsius reading in this unit
    pub fn format(self, temp_c: f64) -> String {
        match self {
            Self::Celsius => format!("{temp_c:.1} °C"),
            Self::Fahrenheit => format!("{:.1} °F", c2f(temp_c)),
        }
    }
}

/// Where the dashboard starts when no city was given or saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultLocation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Default for DefaultLocation {
    fn default() -> Self {
        Self {
            name: "Buenos Aires".to_string(),
            lat: -34.61315,
            lon: -58.37723,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OpenWeatherMap API key; `OPENWEATHER_API_KEY` takes precedence
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Language of the weather descriptions
    #[serde(default = "default_lang")]
    pub lang: String,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u32,

    /// How long geocoding lookups stay cached
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u32,

    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    /// Last city shown, reused when none is given
    pub last_city: Option<String>,

    #[serde(default)]
    pub default_location: DefaultLocation,
}

fn default_base_url() -> String {
    owm::BASE_URL.to_string()
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_refresh_minutes() -> u32 {
    15
}

fn default_cache_ttl_hours() -> u32 {
    24 * 7
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            lang: default_lang(),
            timeout_seconds: default_timeout_seconds(),
            refresh_minutes: default_refresh_minutes(),
            cache_ttl_hours: default_cache_ttl_hours(),
            temperature_unit: TemperatureUnit::default(),
            last_city: None,
            default_location: DefaultLocation::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, creating a default file if it doesn't exist
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "writing default configuration");
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| ClimaError::config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Load and reject configurations with errors; warnings are logged
    pub fn load_validated(path: &Path) -> crate::Result<Self> {
        let config = Self::load_from(path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ClimaError::config(validation.error_summary()));
        }
        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ClimaError::config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// `<config dir>/clima/config.toml`
    pub fn default_path() -> crate::Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| ClimaError::config("no config directory on this system"))?;
        Ok(dir.join("clima").join("config.toml"))
    }

    /// `<cache dir>/clima`, holding the lookup cache and the log file
    pub fn cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clima")
    }

    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        match Url::parse(&self.base_url) {
            Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
                result.add_error(
                    "base_url",
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }
            Ok(url) if url.host().is_none() => result.add_error("base_url", "URL must have a host"),
            Ok(_) => {}
            Err(e) => result.add_error("base_url", format!("Invalid URL: {e}")),
        }

        if self.api_key().is_none() {
            result.add_warning(
                "api_key",
                format!("No API key configured; set api_key or {API_KEY_ENV}"),
            );
        }

        if self.timeout_seconds == 0 {
            result.add_error("timeout_seconds", "Timeout must be greater than 0");
        }

        if self.refresh_minutes == 0 {
            result.add_warning("refresh_minutes", "Automatic refresh disabled (0 minutes)");
        } else if self.refresh_minutes > 1440 {
            result.add_warning("refresh_minutes", "Refresh interval is more than 24 hours");
        }

        let loc = &self.default_location;
        if !(-90.0..=90.0).contains(&loc.lat) || !(-180.0..=180.0).contains(&loc.lon) {
            result.add_error(
                "default_location",
                format!("Coordinates out of range: {}, {}", loc.lat, loc.lon),
            );
        }

        result
    }
}
