//! Runtime configuration.
//!
//! Every setting has a default; environment variables override them at
//! startup.

use crate::constants::{DEFAULT_BLOCKED_PAGE, DEFAULT_GOAL_CHECK_SECS, DEFAULT_TICK_SECS, DEFAULT_USAGE_ALERT_SECS};
use crate::tracker::TrackerConfig;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB: &str = "SITEWARDEN_DB";
pub const ENV_TICK_SECS: &str = "SITEWARDEN_TICK_SECS";
pub const ENV_GOAL_CHECK_SECS: &str = "SITEWARDEN_GOAL_CHECK_SECS";
pub const ENV_USAGE_ALERT_SECS: &str = "SITEWARDEN_USAGE_ALERT_SECS";
pub const ENV_BLOCKED_PAGE: &str = "SITEWARDEN_BLOCKED_PAGE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub tick_interval: Duration,
    pub goal_check_interval: Duration,
    pub usage_alert_secs: f64,
    pub blocked_page: String,
}

/// `<data dir>/sitewarden.db`, or a file in the working directory when the
/// platform has no data directory.
pub fn default_db_path() -> PathBuf {
    ProjectDirs::from("com", "sitewarden", "Sitewarden")
        .map_or_else(|| PathBuf::from("sitewarden.db"), |dirs| dirs.data_dir().join("sitewarden.db"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            tick_interval: Duration::from_secs(DEFAULT_TICK_SECS),
            goal_check_interval: Duration::from_secs(DEFAULT_GOAL_CHECK_SECS),
            usage_alert_secs: DEFAULT_USAGE_ALERT_SECS,
            blocked_page: DEFAULT_BLOCKED_PAGE.to_string(),
        }
    }
}

fn parse_interval(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        Ok(_) => Err(ConfigError::InvalidValue(name, "must be at least 1 second".into())),
        Err(e) => Err(ConfigError::InvalidValue(name, e.to_string())),
    }
}

fn parse_threshold(name: &'static str, raw: &str) -> Result<f64, ConfigError> {
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Ok(secs),
        Ok(_) => Err(ConfigError::InvalidValue(name, "must be a positive number of seconds".into())),
        Err(e) => Err(ConfigError::InvalidValue(name, e.to_string())),
    }
}

impl Config {
    /// Loads configuration from `SITEWARDEN_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB).filter(|p| !p.trim().is_empty()) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(ENV_TICK_SECS) {
            config.tick_interval = parse_interval(ENV_TICK_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_GOAL_CHECK_SECS) {
            config.goal_check_interval = parse_interval(ENV_GOAL_CHECK_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_USAGE_ALERT_SECS) {
            config.usage_alert_secs = parse_threshold(ENV_USAGE_ALERT_SECS, &raw)?;
        }
        if let Some(page) = lookup(ENV_BLOCKED_PAGE) {
            let page = page.trim();
            if !page.starts_with('/') {
                return Err(ConfigError::InvalidValue(
                    ENV_BLOCKED_PAGE,
                    format!("'{page}' must be an extension path starting with '/'"),
                ));
            }
            config.blocked_page = page.to_string();
        }

        Ok(config)
    }

    pub fn tracker(&self) -> TrackerConfig {
        TrackerConfig {
            tick_interval: self.tick_interval,
            usage_alert_secs: self.usage_alert_secs,
        }
    }
}
