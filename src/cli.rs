use std::path::PathBuf;

use clap::builder::{styling::AnsiColor, Styles};
use clap::{Parser, Subcommand};

use clima::units::Unit;

const ABOUT: &str = "OpenWeatherMap weather TUI";

const LONG_ABOUT: &str = "
TUI for viewing current conditions and forecasts sourced from OpenWeatherMap.

The user supplies a city name (e.g. \"Rosario\", \"Madrid, ES\") or coordinates. Without either,
the last city is used, falling back to the default location from the config file.

The city is saved, so subsequent runs of `clima` will use the last city unless otherwise
specified. An API key is read from the config file or the OPENWEATHER_API_KEY variable.
";

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Green.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug)]
#[command(version, styles=STYLES, about=ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    #[arg(help = "City to show (e.g. \"Rosario\", \"Madrid, ES\")")]
    pub city: Option<String>,

    #[arg(
        long,
        requires = "lon",
        allow_negative_numbers = true,
        help = "Latitude instead of a city"
    )]
    pub lat: Option<f64>,

    #[arg(
        long,
        requires = "lat",
        allow_negative_numbers = true,
        help = "Longitude instead of a city"
    )]
    pub lon: Option<f64>,

    #[arg(long, global = true, help = "Path to the config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apparent temperature from temperature, humidity and wind
    FeelsLike {
        #[arg(short, long, allow_negative_numbers = true, help = "Air temperature in °C")]
        temperature: f64,

        #[arg(short = 'u', long, help = "Relative humidity in %")]
        humidity: Option<f64>,

        #[arg(short, long, help = "Wind speed in km/h")]
        wind: Option<f64>,
    },

    /// Convert a temperature or speed between units (C, F, K, kmh, ms, mph, kn)
    Convert {
        #[arg(allow_negative_numbers = true)]
        value: f64,
        from: Unit,
        to: Unit,
    },

    /// List cities matching a name
    Search { query: String },

    /// Print the daily forecast without opening the dashboard
    Forecast { city: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_feels_like_with_negative_temperature() {
        let args = Args::try_parse_from(["clima", "feels-like", "-t", "-5", "-w", "20"]).unwrap();
        match args.command {
            Some(Command::FeelsLike {
                temperature,
                humidity,
                wind,
            }) => {
                assert_eq!(temperature, -5.0);
                assert_eq!(humidity, None);
                assert_eq!(wind, Some(20.0));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_convert() {
        let args = Args::try_parse_from(["clima", "convert", "-40", "C", "F"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Convert {
                from: Unit::Celsius,
                to: Unit::Fahrenheit,
                ..
            })
        ));
    }

    #[test]
    fn test_coordinates_come_in_pairs() {
        assert!(Args::try_parse_from(["clima", "--lat", "-34.6"]).is_err());
        let args = Args::try_parse_from(["clima", "--lat", "-34.6", "--lon", "-58.4"]).unwrap();
        assert_eq!(args.lat, Some(-34.6));
        assert!(args.city.is_none());
    }
}
