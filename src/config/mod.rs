//! Bootstrap settings
//!
//! Settings are loaded with priority (lowest first):
//! 1. Default values (hardcoded)
//! 2. Settings file, when one is given
//! 3. Environment variables prefixed with `LAYERCONF`, sections separated
//!    by `__` (e.g. `LAYERCONF__CACHE__CACHE_TIME_SECS=10`)

mod cache;
mod file;
mod remote;
pub use cache::*;
pub use file::*;
pub use remote::*;


use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use tracing::debug;

use crate::constants::ENV_PREFIX;
use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Local configuration file mounted at bootstrap
    #[serde(default)]
    pub file: FileSettings,
    /// Cache behavior of remote-backed layers
    #[serde(default)]
    pub cache: CacheSettings,
    /// Remote key-value store integration
    #[serde(default)]
    pub remote: RemoteSettings,
}

impl Settings {
    /// Loads and validates the settings.
    ///
    /// # Arguments
    /// * `settings_path` - Optional settings file (TOML or JSON, detected
    ///   from the extension). It must exist when given.
    pub fn load(settings_path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        if let Some(path) = settings_path {
            config = config.add_source(File::with_name(path).required(true));
        }

        // Environment variables (highest priority)
        config = config.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Settings = config.build()?.try_deserialize()?;
        settings.validate()?;
        debug!(?settings, "bootstrap settings loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.remote.validate()?;
        Ok(())
    }
}
