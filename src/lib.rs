mod app;
pub mod blocking;
pub mod categorizer;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod goals;
pub mod hostname;
pub mod models;
pub mod native_host;
pub mod platform;
pub mod store;
#[cfg(test)]
mod test_utils;
pub mod tracker;
pub mod validation;

pub use app::Sitewarden;

use crate::config::{Config, ConfigError};
use crate::error::AppError;
use crate::store::Store;

/// Error type for Sitewarden startup failures
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Could not create data directory: {0}")]
    DataDirCreation(std::io::Error),
    #[error("Failed to open database: {0}")]
    DatabaseOpen(AppError),
}

/// Load configuration from the environment and open its store.
pub fn init() -> Result<(Config, Store), InitError> {
    init_with(|name| std::env::var(name).ok())
}

/// Like [`init`], reading variables through `lookup`.
pub fn init_with<F>(lookup: F) -> Result<(Config, Store), InitError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = Config::from_lookup(lookup)?;
    let store = open_store(&config)?;
    Ok((config, store))
}

/// Open the configured database, creating its directory if needed.
pub fn open_store(config: &Config) -> Result<Store, InitError> {
    if let Some(dir) = config.db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(InitError::DataDirCreation)?;
    }
    Store::open(&config.db_path).map_err(InitError::DatabaseOpen)
}
