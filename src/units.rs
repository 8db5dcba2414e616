use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

pub mod temperature {
    pub fn f2c(temp_f: f64) -> f64 {
        (temp_f - 32.0) * 5.0 / 9.0
    }

    pub fn c2f(temp_c: f64) -> f64 {
        temp_c * 9.0 / 5.0 + 32.0
    }

    pub fn k2c(temp_k: f64) -> f64 {
        temp_k - 273.15
    }

    pub fn c2k(temp_c: f64) -> f64 {
        temp_c + 273.15
    }

    #[test]
    fn test_temperature() {
        assert_eq!(f2c(212.0), 100.0);
        assert_eq!(f2c(32.0), 0.0);
        assert_eq!(c2f(0.0), 32.0);
        assert_eq!(c2f(100.0), 212.0);
        assert_eq!(c2k(0.0), 273.15);
        assert_eq!(k2c(273.15), 0.0);
    }
}

pub mod speed {
    const MPH_PER_KPH: f64 = 0.621371;
    const KNOTS_PER_KPH: f64 = 1.0 / 1.852;

    /// The weather API reports metric wind speeds in m/s
    pub fn ms2kph(ms: f64) -> f64 {
        ms * 3.6
    }

    pub fn kph2ms(kph: f64) -> f64 {
        kph / 3.6
    }

    pub fn kph2mph(kph: f64) -> f64 {
        kph * MPH_PER_KPH
    }

    pub fn mph2kph(mph: f64) -> f64 {
        mph / MPH_PER_KPH
    }

    pub fn kph2knots(kph: f64) -> f64 {
        kph * KNOTS_PER_KPH
    }

    pub fn knots2kph(knots: f64) -> f64 {
        knots / KNOTS_PER_KPH
    }

    #[test]
    fn test_speed() {
        assert_eq!(ms2kph(10.0), 36.0);
        assert!((kph2mph(100.0) - 62.1371).abs() < 1e-9);
        assert!((mph2kph(kph2mph(42.0)) - 42.0).abs() < 1e-9);
        assert!((kph2knots(1.852) - 1.0).abs() < 1e-12);
    }
}

pub mod direction {
    const COMPASS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];
    pub fn degree_to_compass(deg: f64) -> &'static str {
        let deg = deg.rem_euclid(360.0);
        let val = (deg / 22.5 + 0.5) as usize;
        let idx = val % 16;
        COMPASS[idx]
    }

    #[test]
    fn test_degree_to_compass() {
        assert_eq!(degree_to_compass(0.0), "N");
        assert_eq!(degree_to_compass(90.0), "E");
        assert_eq!(degree_to_compass(180.0), "S");
        assert_eq!(degree_to_compass(270.0), "W");
        assert_eq!(degree_to_compass(360.0), "N");
        assert_eq!(degree_to_compass(-45.0), "NW");
        assert_eq!(degree_to_compass(350.0), "N");
    }
}

pub mod daylight {
    /// Daylight between two unix timestamps, e.g. `"10h 12m"`
    pub fn format(sunrise: i64, sunset: i64) -> String {
        let seconds = (sunset - sunrise).max(0);
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        format!("{hours}h {minutes}m")
    }

    #[test]
    fn test_daylight() {
        assert_eq!(format(1_700_000_000, 1_700_000_000 + 10 * 3600 + 12 * 60 + 59), "10h 12m");
        assert_eq!(format(100, 50), "0h 0m");
    }
}

/// Units understood by the conversion widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Celsius,
    Fahrenheit,
    Kelvin,
    KilometersPerHour,
    MetersPerSecond,
    MilesPerHour,
    Knots,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Temperature,
    Speed,
}

impl Unit {
    pub const ALL: [Unit; 7] = [
        Unit::Celsius,
        Unit::Fahrenheit,
        Unit::Kelvin,
        Unit::KilometersPerHour,
        Unit::MetersPerSecond,
        Unit::MilesPerHour,
        Unit::Knots,
    ];

    pub fn quantity(&self) -> Quantity {
        match self {
            Unit::Celsius | Unit::Fahrenheit | Unit::Kelvin => Quantity::Temperature,
            _ => Quantity::Speed,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
            Unit::Kelvin => "K",
            Unit::KilometersPerHour => "km/h",
            Unit::MetersPerSecond => "m/s",
            Unit::MilesPerHour => "mph",
            Unit::Knots => "kn",
        }
    }

    // Everything goes through °C or km/h.
    fn to_base(self, value: f64) -> f64 {
        match self {
            Unit::Celsius | Unit::KilometersPerHour => value,
            Unit::Fahrenheit => temperature::f2c(value),
            Unit::Kelvin => temperature::k2c(value),
            Unit::MetersPerSecond => speed::ms2kph(value),
            Unit::MilesPerHour => speed::mph2kph(value),
            Unit::Knots => speed::knots2kph(value),
        }
    }

    fn from_base(self, value: f64) -> f64 {
        match self {
            Unit::Celsius | Unit::KilometersPerHour => value,
            Unit::Fahrenheit => temperature::c2f(value),
            Unit::Kelvin => temperature::c2k(value),
            Unit::MetersPerSecond => speed::kph2ms(value),
            Unit::MilesPerHour => speed::kph2mph(value),
            Unit::Knots => speed::kph2knots(value),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "c" | "°c" | "celsius" => Ok(Unit::Celsius),
            "f" | "°f" | "fahrenheit" => Ok(Unit::Fahrenheit),
            "k" | "kelvin" => Ok(Unit::Kelvin),
            "kmh" | "km/h" | "kph" => Ok(Unit::KilometersPerHour),
            "ms" | "m/s" => Ok(Unit::MetersPerSecond),
            "mph" => Ok(Unit::MilesPerHour),
            "kn" | "kt" | "knots" => Ok(Unit::Knots),
            other => Err(CoreError::invalid_input(format!("unknown unit \"{other}\""))),
        }
    }
}

/// Converts `value` between two units of the same quantity
pub fn convert(value: f64, from: Unit, to: Unit) -> Result<f64, CoreError> {
    if !value.is_finite() {
        return Err(CoreError::invalid_input(format!("{value} is not a finite number")));
    }
    if from.quantity() != to.quantity() {
        return Err(CoreError::invalid_input(format!("cannot convert {from} to {to}")));
    }
    Ok(to.from_base(from.to_base(value)))
}
