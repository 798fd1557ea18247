//! Configuration module for the dashboard data core
//!
//! Defaults are compiled in. An optional file (TOML, YAML or JSON, chosen by
//! extension) and `DASHBOARD__SECTION__KEY` environment variables are layered
//! on top, in that order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dashboard::DateRangePreset;
use crate::error::{DashboardError, Result};
use crate::generators::{SeriesParams, MAX_WINDOW_DAYS};

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_ENV: &str = "DASHBOARD_CONFIG_FILE";

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "DASHBOARD";

/// Main configuration for the dashboards
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dataset generation parameters
    pub generation: GenerationConfig,
    /// Data explorer series parameters
    pub series: SeriesConfig,
    /// View defaults
    pub view: ViewConfig,
    /// CSV export settings
    pub export: ExportConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Dataset generation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Days of sales history before today
    pub sales_window_days: i64,
    /// Number of generated users
    pub user_count: usize,
    /// Number of generated tickets
    pub ticket_count: usize,
    /// Random seed; a fresh entropy seed is used when absent
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            sales_window_days: 90,
            user_count: 1000,
            ticket_count: 200,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesConfig {
    pub size: usize,
    pub noise: f64,
}

impl SeriesConfig {
    pub fn params(&self) -> SeriesParams {
        SeriesParams::new(self.size, self.noise)
    }
}

impl Default for SeriesConfig {
    fn default() -> Self {
        let params = SeriesParams::default();
        Self {
            size: params.size,
            noise: params.noise,
        }
    }
}

/// View defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Rows per page in the directory and queue views
    pub page_size: usize,
    /// Date range used when a request does not name one
    pub default_range: DateRangePreset,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            default_range: DateRangePreset::Last7Days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory CSV exports are written to
    pub directory: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or text)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from `DASHBOARD_CONFIG_FILE` and the environment
    pub fn from_env() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);
        Self::load(file.as_deref())
    }

    /// Load configuration from an optional file plus the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut cfg = config::Config::builder();

        if let Some(path) = file {
            cfg = cfg.add_source(config::File::from(path.to_path_buf()));
        }

        cfg = cfg.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );

        let config: Self = cfg.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let generation = &self.generation;
        if !(0..=MAX_WINDOW_DAYS).contains(&generation.sales_window_days) {
            return Err(DashboardError::configuration(format!(
                "Sales window must be between 0 and {} days",
                MAX_WINDOW_DAYS
            )));
        }
        if generation.user_count == 0 {
            return Err(DashboardError::configuration(
                "User count must be greater than 0",
            ));
        }
        if generation.ticket_count == 0 {
            return Err(DashboardError::configuration(
                "Ticket count must be greater than 0",
            ));
        }

        self.series
            .params()
            .validate()
            .map_err(|e| DashboardError::configuration(format!("Series: {}", e)))?;

        if self.view.page_size == 0 {
            return Err(DashboardError::configuration(
                "Page size must be greater than 0",
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(DashboardError::configuration(format!(
                "Unknown log level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }
}
