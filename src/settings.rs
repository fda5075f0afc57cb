//! Settings, read in layers with later layers winning:
//! 1. built-in defaults
//! 2. `boutinf.toml` (or .json, .yaml ...) in the working directory, if present
//! 3. an explicitly named config file, which must exist
//! 4. `BOUTINF_*` environment variables, e.g. `BOUTINF_INDEX_DIRECTORY`

use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::engine::DEFAULT_CACHE_SIZE;
use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Directory holding one file per attribute index.
    pub index_directory: String,
    /// SQLite database with the Message and Participant tables.
    pub database_path: String,
    pub log_level: String,
    pub query_cache_size: usize,
    /// Wall-clock budget of a query in milliseconds, 0 for none.
    pub query_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_directory: "index".to_string(),
            database_path: "boutinf.db".to_string(),
            log_level: "info".to_string(),
            query_cache_size: DEFAULT_CACHE_SIZE,
            query_timeout_ms: 0,
        }
    }
}

impl Settings {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("index_directory", defaults.index_directory)?
            .set_default("database_path", defaults.database_path)?
            .set_default("log_level", defaults.log_level)?
            .set_default("query_cache_size", defaults.query_cache_size as i64)?
            .set_default("query_timeout_ms", defaults.query_timeout_ms as i64)?
            .add_source(File::with_name("boutinf").required(false));
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }
        builder = builder.add_source(Environment::with_prefix("BOUTINF").try_parsing(true));
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        (self.query_timeout_ms > 0).then(|| Duration::from_millis(self.query_timeout_ms))
    }
}
