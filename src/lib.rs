//! clima - terminal weather dashboard
//!
//! The core is two pure calculations: the apparent ("feels like")
//! temperature in [`thermal`] and the per-day forecast summary in
//! [`forecast`]. The remaining modules fetch, cache and configure the data
//! the dashboard feeds them.

pub mod cache;
pub mod config;
pub mod error;
pub mod forecast;
pub mod location;
pub mod owm;
pub mod snapshot;
pub mod thermal;
pub mod units;

pub use config::Config;
pub use error::{ClimaError, CoreError};
pub use forecast::{aggregate, DailyForecastEntry, RawSample};
pub use snapshot::Snapshot;
pub use thermal::{compute, Model, ThermalInput, ThermalResult};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, ClimaError>;
