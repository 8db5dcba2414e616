//! OpenWeatherMap endpoints used by the dashboard.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use reqwest::blocking::{Client as HttpClient, Response};
use serde::Deserialize;

use crate::config::Config;
use crate::error::CoreError;
use crate::forecast;
use crate::units::speed::ms2kph;

pub const BASE_URL: &str = "https://api.openweathermap.org";
const USER_AGENT: &str = concat!("clima/", env!("CARGO_PKG_VERSION"));

/// Shared `weather` array entry of the current and forecast payloads
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Weather {
    pub description: String,
    pub icon: String,
}

impl From<&Weather> for forecast::Condition {
    fn from(weather: &Weather) -> Self {
        Self {
            description: weather.description.clone(),
            icon_id: weather.icon.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct Wind {
    /// m/s with `units=metric`
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
    pub gust: Option<f64>,
}

impl From<Wind> for forecast::Wind {
    fn from(wind: Wind) -> Self {
        Self {
            speed_kmh: ms2kph(wind.speed),
            gust_kmh: wind.gust.map(ms2kph),
            direction_deg: wind.deg,
        }
    }
}

fn offset_from_seconds(seconds: i32) -> FixedOffset {
    FixedOffset::east_opt(seconds).unwrap_or_else(|| Utc.fix())
}

/// Unix seconds to a timestamp in the location's own offset
pub fn local_time(unix: i64, offset_seconds: i32) -> Option<DateTime<FixedOffset>> {
    let offset = offset_from_seconds(offset_seconds);
    DateTime::from_timestamp(unix, 0).map(|utc| utc.with_timezone(&offset))
}

pub mod current {
    use super::*;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Current {
        #[serde(default)]
        pub name: String,

        pub dt: i64,

        /// Shift in seconds from UTC
        #[serde(default)]
        pub timezone: i32,

        pub main: Main,

        #[serde(default)]
        pub weather: Vec<Weather>,

        #[serde(default)]
        pub wind: Wind,

        #[serde(default)]
        pub sys: Sys,
    }

    impl Current {
        pub fn condition(&self) -> Option<&Weather> {
            self.weather.first()
        }

        pub fn observed_at(&self) -> Option<DateTime<FixedOffset>> {
            local_time(self.dt, self.timezone)
        }
    }

    #[derive(Deserialize, Debug, Clone)]
    pub struct Main {
        pub temp: f64,
        pub pressure: Option<f64>,
        pub humidity: Option<f64>,
    }

    #[derive(Deserialize, Debug, Clone, Default)]
    pub struct Sys {
        pub country: Option<String>,
        pub sunrise: Option<i64>,
        pub sunset: Option<i64>,
    }
}

pub mod forecast_feed {
    use super::*;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Forecast {
        pub list: Option<Vec<Item>>,
        pub city: Option<City>,
    }

    impl Forecast {
        pub fn offset_seconds(&self) -> i32 {
            self.city.as_ref().map(|c| c.timezone).unwrap_or_default()
        }

        /// Converts the feed into samples in the city's offset, wind in km/h.
        /// A feed without a `list` is malformed.
        pub fn samples(&self) -> Result<Vec<forecast::RawSample>, CoreError> {
            let list = self
                .list
                .as_ref()
                .ok_or_else(|| CoreError::malformed_feed("forecast response has no list"))?;
            let offset = self.offset_seconds();

            list.iter()
                .map(|item| {
                    let timestamp = local_time(item.dt, offset).ok_or_else(|| {
                        CoreError::malformed_feed(format!("timestamp {} out of range", item.dt))
                    })?;
                    Ok(forecast::RawSample {
                        timestamp,
                        temperature_c: item.main.temp,
                        condition: item
                            .weather
                            .first()
                            .map(forecast::Condition::from)
                            .unwrap_or_default(),
                        wind: item.wind.into(),
                    })
                })
                .collect()
        }
    }

    #[derive(Deserialize, Debug, Clone)]
    pub struct Item {
        pub dt: i64,
        pub main: Main,
        #[serde(default)]
        pub weather: Vec<Weather>,
        #[serde(default)]
        pub wind: Wind,
    }

    #[derive(Deserialize, Debug, Clone)]
    pub struct Main {
        pub temp: f64,
    }

    #[derive(Deserialize, Debug, Clone)]
    pub struct City {
        pub name: String,
        #[serde(default)]
        pub country: String,
        #[serde(default)]
        pub timezone: i32,
    }

    impl City {
        pub fn display_name(&self) -> String {
            if self.country.is_empty() {
                self.name.clone()
            } else {
                format!("{}, {}", self.name, self.country)
            }
        }
    }
}

pub mod geocoding {
    use serde::Serialize;

    use super::*;

    #[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
    pub struct Place {
        pub name: String,
        pub state: Option<String>,
        #[serde(default)]
        pub country: String,
        pub lat: f64,
        pub lon: f64,
    }

    impl Place {
        /// "name, state, country" with the state left out when unknown
        pub fn display_name(&self) -> String {
            match self.state.as_deref().filter(|s| !s.is_empty()) {
                Some(state) => format!("{}, {}, {}", self.name, state, self.country),
                None => format!("{}, {}", self.name, self.country),
            }
        }
    }
}

/// Blocking client for the weather and geocoding APIs
pub struct Client {
    http: HttpClient,
    base_url: String,
    api_key: String,
    lang: String,
}

impl Client {
    pub fn new(
        base_url: &str,
        api_key: &str,
        lang: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = HttpClient::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            lang: lang.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let api_key = config
            .api_key()
            .ok_or_else(|| crate::ClimaError::config("no OpenWeatherMap API key configured"))?;
        Ok(Self::new(
            &config.base_url,
            &api_key,
            &config.lang,
            Duration::from_secs(config.timeout_seconds),
        )?)
    }

    pub fn current_by_coords(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<current::Current, reqwest::Error> {
        self.weather_call(
            "/data/2.5/weather",
            &[("lat", lat.to_string()), ("lon", lon.to_string())],
        )
    }

    pub fn forecast_by_coords(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<forecast_feed::Forecast, reqwest::Error> {
        self.weather_call(
            "/data/2.5/forecast",
            &[("lat", lat.to_string()), ("lon", lon.to_string())],
        )
    }

    pub fn direct(&self, query: &str, limit: u8) -> Result<Vec<geocoding::Place>, reqwest::Error> {
        self.get_web_json(
            "/geo/1.0/direct",
            &[("q", query.to_string()), ("limit", limit.to_string())],
        )?
        .error_for_status()?
        .json()
    }

    pub fn reverse(&self, lat: f64, lon: f64) -> Result<Vec<geocoding::Place>, reqwest::Error> {
        self.get_web_json(
            "/geo/1.0/reverse",
            &[("lat", lat.to_string()), ("lon", lon.to_string()), ("limit", "1".to_string())],
        )?
        .error_for_status()?
        .json()
    }

    fn weather_call<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, reqwest::Error> {
        let mut params = params.to_vec();
        params.push(("units", "metric".to_string()));
        params.push(("lang", self.lang.clone()));
        self.get_web_json(path, &params)?.error_for_status()?.json()
    }

    fn get_web_json(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Response, reqwest::Error> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "GET");
        self.http
            .get(&url)
            .query(params)
            .query(&[("appid", &self.api_key)])
            .send()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_display_name() {
        let mut place = geocoding::Place {
            name: "Córdoba".to_string(),
            state: Some("Córdoba".to_string()),
            country: "AR".to_string(),
            lat: -31.4,
            lon: -64.18,
        };
        assert_eq!(place.display_name(), "Córdoba, Córdoba, AR");
        place.state = None;
        assert_eq!(place.display_name(), "Córdoba, AR");
    }

    #[test]
    fn test_local_time_applies_offset() {
        let ts = local_time(1_720_000_000, -3 * 3600).unwrap();
        assert_eq!(ts.offset().local_minus_utc(), -3 * 3600);
        assert_eq!(ts.timestamp(), 1_720_000_000);
    }

    #[test]
    fn test_forecast_without_list_is_malformed() {
        let json = r#"{"cod":"200","city":null}"#;
        let feed: forecast_feed::Forecast = serde_json::from_str(json).unwrap();
        assert!(matches!(feed.samples(), Err(CoreError::MalformedFeed(_))));
    }

    #[test]
    fn test_forecast_item_converts_wind_to_kmh() {
        let json = r#"{
            "list": [{
                "dt": 1720008000,
                "main": {"temp": 7.5, "temp_min": 7.0, "temp_max": 8.0, "humidity": 81},
                "weather": [{"main": "Rain", "description": "light rain", "icon": "10n"}],
                "wind": {"speed": 5.0, "deg": 200, "gust": 9.5}
            }],
            "city": {"name": "Buenos Aires", "country": "AR", "timezone": -10800}
        }"#;
        let feed: forecast_feed::Forecast = serde_json::from_str(json).unwrap();
        let samples = feed.samples().unwrap();
        assert_eq!(samples.len(), 1);
        let s = &samples[0];
        assert_eq!(s.wind.speed_kmh, 18.0);
        assert_eq!(s.wind.gust_kmh, Some(34.2));
        assert_eq!(s.wind.direction_deg, 200.0);
        assert_eq!(s.condition.description, "light rain");
        assert_eq!(s.timestamp.offset().local_minus_utc(), -10800);
        assert_eq!(feed.city.unwrap().display_name(), "Buenos Aires, AR");
    }

    #[test]
    fn test_minimal_payloads_parse() {
        let json = r#"{
            "dt": 1720008000,
            "main": {"temp": 12.0},
            "weather": [{"description": "mist", "icon": "50d"}]
        }"#;
        let current: current::Current = serde_json::from_str(json).unwrap();
        assert_eq!(current.main.humidity, None);
        assert_eq!(current.condition().map(|w| w.description.as_str()), Some("mist"));

        let json = r#"{"list": [{"dt": 1720008000, "main": {"temp": 3.0}}]}"#;
        let feed: forecast_feed::Forecast = serde_json::from_str(json).unwrap();
        let samples = feed.samples().unwrap();
        assert_eq!(samples[0].temperature_c, 3.0);
        assert_eq!(samples[0].condition, forecast::Condition::default());
        assert_eq!(samples[0].wind.gust_kmh, None);
    }
}
