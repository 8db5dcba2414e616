//! Error types for clima

use thiserror::Error;

/// Failures of the pure calculations (feels-like temperature, forecast folding).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The primary temperature (or another required value) is unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The forecast feed has no usable sample list
    #[error("Malformed forecast feed: {0}")]
    MalformedFeed(String),
}

impl CoreError {
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn malformed_feed<S: Into<String>>(message: S) -> Self {
        Self::MalformedFeed(message.into())
    }
}

/// Main error type for the dashboard and its collaborators
#[derive(Error, Debug)]
pub enum ClimaError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// HTTP or decoding failure talking to the weather service
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Geocoding returned nothing for the query
    #[error("Location not found: {query}")]
    NotFound { query: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClimaError {
    pub fn not_found<S: Into<String>>(query: S) -> Self {
        Self::NotFound {
            query: query.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Short message suitable for the dashboard status line
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ClimaError::Core(CoreError::InvalidInput(message)) => {
                format!("Invalid input: {message}")
            }
            ClimaError::Core(CoreError::MalformedFeed(_)) => {
                "The forecast service returned unusable data.".to_string()
            }
            ClimaError::Http(err) if err.status().is_some_and(|s| s.as_u16() == 401) => {
                "The weather service rejected the API key.".to_string()
            }
            ClimaError::Http(_) => {
                "Unable to reach the weather service. Check your internet connection.".to_string()
            }
            ClimaError::NotFound { query } => format!("Could not find the city \"{query}\"."),
            ClimaError::Config { .. } => {
                "Configuration error. Please check your config file and API key.".to_string()
            }
            ClimaError::Cache { .. } | ClimaError::Io { .. } | ClimaError::Json(_) => {
                "Local cache could not be used. You may need to clear it.".to_string()
            }
        }
    }
}
