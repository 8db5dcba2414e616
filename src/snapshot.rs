//! Everything one dashboard refresh needs, built from the two weather calls.

use chrono::{DateTime, FixedOffset, Utc};

use crate::forecast::{self, Condition, DailyForecastEntry, RawSample, Wind, THREE_HOUR_SAMPLES};
use crate::owm::current::Current;
use crate::owm::forecast_feed::Forecast;
use crate::owm::{self, Client};
use crate::thermal::{self, ThermalResult};
use crate::units::daylight;

#[derive(Debug, Clone)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub humidity_pct: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub wind: Wind,
    pub condition: Condition,
    pub observed_at: Option<DateTime<FixedOffset>>,
    /// e.g. "13h 2m"
    pub daylight: Option<String>,
    /// Computed from the live temperature, humidity and wind
    pub feels_like: Option<ThermalResult>,
}

impl From<&Current> for CurrentConditions {
    fn from(current: &Current) -> Self {
        let wind: Wind = current.wind.into();
        let main = &current.main;
        let feels_like = match thermal::compute(main.temp, main.humidity, Some(wind.speed_kmh)) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!("feels-like unavailable: {e}");
                None
            }
        };
        let daylight = match (current.sys.sunrise, current.sys.sunset) {
            (Some(sunrise), Some(sunset)) => Some(daylight::format(sunrise, sunset)),
            _ => None,
        };

        Self {
            temperature_c: current.main.temp,
            humidity_pct: current.main.humidity,
            pressure_hpa: current.main.pressure,
            wind,
            condition: current.condition().map(Condition::from).unwrap_or_default(),
            observed_at: current.observed_at(),
            daylight,
            feels_like,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub place: String,
    pub current: CurrentConditions,
    /// Min and max still forecast for the current day
    pub today_range: Option<(f64, f64)>,
    pub daily: Vec<DailyForecastEntry>,
    pub hourly: Vec<RawSample>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// "Today" is `now` in the forecast city's own offset.
    pub fn build(
        place: &str,
        current: &Current,
        feed: &Forecast,
        now: DateTime<Utc>,
    ) -> crate::Result<Self> {
        let samples = feed.samples()?;
        let reference = owm::local_time(now.timestamp(), feed.offset_seconds())
            .map(|t| t.date_naive())
            .unwrap_or_else(|| now.date_naive());

        let daily = forecast::aggregate(&samples, reference)?;
        let place = if place.is_empty() {
            feed.city
                .as_ref()
                .map(|c| c.display_name())
                .unwrap_or_else(|| current.name.clone())
        } else {
            place.to_string()
        };

        Ok(Self {
            place,
            current: CurrentConditions::from(current),
            today_range: forecast::today_range(&samples, reference),
            daily,
            hourly: forecast::upcoming(&samples, THREE_HOUR_SAMPLES).to_vec(),
            fetched_at: now,
        })
    }
}

/// Fetches current conditions and the forecast for a location
pub fn fetch(client: &Client, place: &str, lat: f64, lon: f64) -> crate::Result<Snapshot> {
    tracing::info!(place, lat, lon, "fetching weather");
    let current = client.current_by_coords(lat, lon)?;
    let feed = client.forecast_by_coords(lat, lon)?;
    Snapshot::build(place, &current, &feed, Utc::now())
}
