use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;

use crate::app::{run_app, App};
use crate::cli::{Args, Command};

use clima::cache::Cache;
use clima::config::TemperatureUnit;
use clima::location::{Locator, MIN_SUGGESTION_CHARS};
use clima::owm::Client;
use clima::units::{self, direction::degree_to_compass};
use clima::{snapshot, Config};

const CACHE_FILE: &str = "lookups.json";
const LOG_FILE: &str = "clima.log";

/// Logs go to a file while the dashboard owns the terminal, stderr otherwise
fn init_tracing(to_file: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if to_file {
        let dir = Config::cache_dir();
        let file = std::fs::create_dir_all(&dir).and_then(|_| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(LOG_FILE))
        });
        if let Ok(file) = file {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// The place a run is about: label plus coordinates
struct Target {
    place: String,
    lat: f64,
    lon: f64,
}

fn resolve_target(
    config: &Config,
    cache: &mut Cache,
    client: &Client,
    city: Option<&str>,
    coords: Option<(f64, f64)>,
) -> anyhow::Result<Target> {
    let ttl = Duration::from_secs(u64::from(config.cache_ttl_hours) * 3600);
    let mut locator = Locator::new(client, cache, ttl);

    if let Some((lat, lon)) = coords {
        // An empty label lets the forecast feed name the place
        let place = locator.city_for_coords(lat, lon).unwrap_or_default();
        return Ok(Target { place, lat, lon });
    }

    match city.or(config.last_city.as_deref()) {
        Some(city) => {
            let place = locator
                .resolve_city(city)
                .with_context(|| format!("failed to look up \"{city}\""))?;
            Ok(Target {
                place: place.display_name(),
                lat: place.lat,
                lon: place.lon,
            })
        }
        None => {
            let home = &config.default_location;
            Ok(Target {
                place: home.name.clone(),
                lat: home.lat,
                lon: home.lon,
            })
        }
    }
}

fn open_cache() -> Cache {
    Cache::open(Config::cache_dir().join(CACHE_FILE))
}

fn save_cache(cache: &mut Cache) {
    if let Err(e) = cache.save() {
        tracing::warn!("failed to save lookup cache: {e}");
    }
}

fn search(config: &Config, query: &str) -> anyhow::Result<()> {
    if query.trim().chars().count() < MIN_SUGGESTION_CHARS {
        println!("Type at least {MIN_SUGGESTION_CHARS} characters to search.");
        return Ok(());
    }

    let client = Client::from_config(config)?;
    let mut cache = open_cache();
    let ttl = Duration::from_secs(u64::from(config.cache_ttl_hours) * 3600);
    let places = Locator::new(&client, &mut cache, ttl)
        .suggestions(query)
        .context("city search failed")?;

    if places.is_empty() {
        println!("No matches for \"{query}\"");
    }
    for place in places {
        println!("{:40} {:9.4} {:9.4}", place.display_name(), place.lat, place.lon);
    }
    Ok(())
}

fn print_forecast(config: &Config, city: Option<&str>) -> anyhow::Result<()> {
    let client = Client::from_config(config)?;
    let mut cache = open_cache();
    let target = resolve_target(config, &mut cache, &client, city, None)?;
    save_cache(&mut cache);

    let snapshot = snapshot::fetch(&client, &target.place, target.lat, target.lon)
        .context("failed to fetch the forecast")?;
    let units = config.temperature_unit;

    println!("{}", snapshot.place);
    if let Some(feels) = snapshot.current.feels_like {
        println!(
            "Now {}, feels like {} ({})",
            units.format(snapshot.current.temperature_c),
            units.format(feels.apparent_temperature_c),
            feels.model
        );
    }
    for day in &snapshot.daily {
        let gust = day
            .wind_gust_max
            .map(|g| format!(", gusts {g:.0}"))
            .unwrap_or_default();
        println!(
            "{}  {} / {}  {}  {:.0} km/h {}{}",
            day.date.format("%a %d/%m"),
            units.format(day.temp_min),
            units.format(day.temp_max),
            day.condition.description,
            day.wind_speed_max,
            degree_to_compass(day.wind_direction_at_max_speed),
            gust
        );
    }
    Ok(())
}

fn dashboard(
    mut config: Config,
    config_path: &Path,
    city: Option<String>,
    coords: Option<(f64, f64)>,
) -> anyhow::Result<()> {
    let client = Client::from_config(&config)?;
    let mut cache = open_cache();
    let target = resolve_target(&config, &mut cache, &client, city.as_deref(), coords)?;
    save_cache(&mut cache);

    if let Some(city) = city {
        config.last_city = Some(city);
    }

    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // create app and run it
    let mut app = App::new(config.temperature_unit);
    let refresh = Duration::from_secs(u64::from(config.refresh_minutes) * 60);
    let res = run_app(&mut terminal, &mut app, refresh, || {
        snapshot::fetch(&client, &target.place, target.lat, target.lon)
    });

    // restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    config.temperature_unit = app.units();
    config
        .save_to(config_path)
        .with_context(|| format!("failed to save {}", config_path.display()))?;

    res.context("dashboard failed")
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.command.is_none());

    match args.command {
        Some(Command::FeelsLike {
            temperature,
            humidity,
            wind,
        }) => {
            let result = clima::compute(temperature, humidity, wind)?;
            println!(
                "{} ({})",
                TemperatureUnit::Celsius.format(result.apparent_temperature_c),
                result.model
            );
            return Ok(());
        }
        Some(Command::Convert { value, from, to }) => {
            let converted = units::convert(value, from, to)?;
            println!("{converted:.2} {}", to.symbol());
            return Ok(());
        }
        _ => {}
    }

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let config = Config::load_validated(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    match args.command {
        Some(Command::Search { query }) => search(&config, &query),
        Some(Command::Forecast { city }) => print_forecast(&config, city.as_deref()),
        _ => dashboard(config, &config_path, args.city, args.lat.zip(args.lon)),
    }
}
