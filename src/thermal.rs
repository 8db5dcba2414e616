//! Apparent ("feels like") temperature.
//!
//! Three mutually exclusive models are checked in order: wind chill for cold,
//! windy conditions, heat index for hot, humid conditions, and otherwise the
//! air temperature itself.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Wind chill applies below this air temperature (°C)
pub const WIND_CHILL_MAX_TEMP_C: f64 = 10.0;
/// Minimum wind speed (km/h) for wind chill
pub const WIND_CHILL_MIN_WIND_KMH: f64 = 4.8;
/// Heat index applies from this air temperature (°C)
pub const HEAT_INDEX_MIN_TEMP_C: f64 = 27.0;
/// Minimum relative humidity (%) for heat index
pub const HEAT_INDEX_MIN_HUMIDITY: f64 = 40.0;

// Rothfusz regression, metric coefficients.
const C1: f64 = -8.784_694_755_56;
const C2: f64 = 1.611_394_11;
const C3: f64 = 2.338_548_838_89;
const C4: f64 = -0.146_116_05;
const C5: f64 = -0.012_308_094;
const C6: f64 = -0.016_424_827_777_8;
const C7: f64 = 0.002_211_732;
const C8: f64 = 0.000_725_46;
const C9: f64 = -0.000_003_582;

/// Which correction produced an apparent temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    WindChill,
    HeatIndex,
    Identity,
}

impl Model {
    /// Explanatory label shown next to the result
    pub fn label(&self) -> &'static str {
        match self {
            Self::WindChill => "Wind chill index",
            Self::HeatIndex => "Heat index",
            Self::Identity => "Actual temperature",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalInput {
    pub temperature_c: f64,
    pub humidity_pct: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
}

impl ThermalInput {
    pub fn new(temperature_c: f64) -> Self {
        Self {
            temperature_c,
            humidity_pct: None,
            wind_speed_kmh: None,
        }
    }

    pub fn with_humidity(mut self, humidity_pct: f64) -> Self {
        self.humidity_pct = Some(humidity_pct);
        self
    }

    pub fn with_wind_speed(mut self, wind_speed_kmh: f64) -> Self {
        self.wind_speed_kmh = Some(wind_speed_kmh);
        self
    }

    pub fn compute(&self) -> Result<ThermalResult, CoreError> {
        compute(self.temperature_c, self.humidity_pct, self.wind_speed_kmh)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalResult {
    pub apparent_temperature_c: f64,
    pub model: Model,
}

/// Computes the apparent temperature.
///
/// Fails with [`CoreError::InvalidInput`] only when `temperature_c` is not
/// finite. Humidity outside 0-100 %, negative wind and non-finite readings
/// count as missing and only disqualify their own model.
pub fn compute(
    temperature_c: f64,
    humidity_pct: Option<f64>,
    wind_speed_kmh: Option<f64>,
) -> Result<ThermalResult, CoreError> {
    if !temperature_c.is_finite() {
        return Err(CoreError::invalid_input(format!(
            "temperature must be a finite number, got {temperature_c}"
        )));
    }
    let humidity = humidity_pct.filter(|h| (0.0..=100.0).contains(h));
    let wind = wind_speed_kmh.filter(|v| v.is_finite() && *v >= 0.0);

    let model = select_model(temperature_c, humidity, wind);
    let apparent_temperature_c = match model {
        Model::WindChill => wind_chill(temperature_c, wind.unwrap_or_default()),
        Model::HeatIndex => heat_index(temperature_c, humidity.unwrap_or_default()),
        Model::Identity => temperature_c,
    };

    Ok(ThermalResult {
        apparent_temperature_c,
        model,
    })
}

/// Picks the correction model for the given readings. First match wins.
pub fn select_model(
    temperature_c: f64,
    humidity_pct: Option<f64>,
    wind_speed_kmh: Option<f64>,
) -> Model {
    if temperature_c < WIND_CHILL_MAX_TEMP_C
        && wind_speed_kmh.is_some_and(|v| v >= WIND_CHILL_MIN_WIND_KMH)
    {
        Model::WindChill
    } else if temperature_c >= HEAT_INDEX_MIN_TEMP_C
        && humidity_pct.is_some_and(|h| h >= HEAT_INDEX_MIN_HUMIDITY)
    {
        Model::HeatIndex
    } else {
        Model::Identity
    }
}

/// Canadian wind chill index, °C and km/h
pub fn wind_chill(temperature_c: f64, wind_speed_kmh: f64) -> f64 {
    let v = wind_speed_kmh.powf(0.16);
    13.12 + 0.6215 * temperature_c - 11.37 * v + 0.3965 * temperature_c * v
}

/// Rothfusz heat index regression with metric coefficients
pub fn heat_index(temperature_c: f64, humidity_pct: f64) -> f64 {
    let t = temperature_c;
    let h = humidity_pct;
    C1 + C2 * t
        + C3 * h
        + C4 * t * h
        + C5 * t * t
        + C6 * h * h
        + C7 * t * t * h
        + C8 * t * h * h
        + C9 * t * t * h * h
}

/// Whether the humidity field matters for this temperature (calculator form)
pub fn humidity_relevant(temperature_c: f64) -> bool {
    temperature_c > WIND_CHILL_MAX_TEMP_C
}

/// Whether the wind field matters for this temperature (calculator form)
pub fn wind_relevant(temperature_c: f64) -> bool {
    temperature_c < HEAT_INDEX_MIN_TEMP_C
}

/// Parses the calculator form.
///
/// A blank or unparsable optional field is treated as missing; the
/// temperature is required.
pub fn parse_input(
    temperature: &str,
    humidity: &str,
    wind_speed: &str,
) -> Result<ThermalInput, CoreError> {
    let temperature_c = parse_number(temperature).ok_or_else(|| {
        CoreError::invalid_input(format!("\"{}\" is not a temperature", temperature.trim()))
    })?;

    Ok(ThermalInput {
        temperature_c,
        humidity_pct: parse_number(humidity),
        wind_speed_kmh: parse_number(wind_speed),
    })
}

fn parse_number(field: &str) -> Option<f64> {
    field
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}
