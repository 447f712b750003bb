#![forbid(unsafe_code)]

//! Logging configuration.
//!
//! The library only emits `tracing` events; it never installs a subscriber
//! on its own. Hosts that have no subscriber of their own can enable the
//! `logging` feature and call [`init_logging`] with a [`LoggingConfig`].
//!
//! | Target level | Emitted for                                         |
//! |--------------|-----------------------------------------------------|
//! | `warn`       | unhandled stream errors, dropped `unpacked` values  |
//! | `debug`      | fail-fast teardowns, superseded `switch_all` inners |
//! | `trace`      | pipe stages, cancellations, resource release        |
//!
//! # Environment
//!
//! [`LoggingConfig::from_env`] reads:
//!
//! - `RIVULET_LOG`: filter directive (e.g. `rivulet=debug`).
//! - `RIVULET_LOG_JSON`: `1`/`true`/`yes`/`on` selects JSON output.

#[cfg(feature = "logging")]
use crate::error::LoggingError;

/// Environment variable holding the filter directive.
pub const LOG_FILTER_ENV: &str = "RIVULET_LOG";
/// Environment variable selecting JSON output.
pub const LOG_JSON_ENV: &str = "RIVULET_LOG_JSON";

/// Configuration for [`init_logging`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,
    /// Include the event target (module path) in each line.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_owned(),
            json: false,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Read the configuration from `RIVULET_LOG` and `RIVULET_LOG_JSON`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(filter) = get_env(LOG_FILTER_ENV) {
            let filter = filter.trim();
            if !filter.is_empty() {
                config.filter = filter.to_owned();
            }
        }
        if let Some(value) = get_env(LOG_JSON_ENV) {
            config.json = env_flag(&value);
        }
        config
    }

    /// Set the filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the filter to a single maximum level.
    #[must_use]
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.filter = level.as_str().to_ascii_lowercase();
        self
    }

    /// Select JSON output.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Include or omit event targets.
    #[must_use]
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }
}

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Install a global `tracing` subscriber built from `config`.
///
/// # Errors
///
/// [`LoggingError::InvalidFilter`] if the filter directive does not parse,
/// [`LoggingError::AlreadyInitialized`] if a global subscriber is already
/// set.
#[cfg(feature = "logging")]
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|err| LoggingError::InvalidFilter(err.to_string()))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|_| LoggingError::AlreadyInitialized)
}
