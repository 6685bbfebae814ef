use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;

use crate::cache::CacheOptions;
use crate::cache::RefreshMode;
use crate::Error;
use crate::Result;

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    /// Seconds before a cached remote document is considered stale.
    /// 0 disables time-based refresh.
    #[serde(default = "default_cache_time_secs")]
    pub cache_time_secs: u64,

    /// Serve stale documents while refreshing in the background
    #[serde(default)]
    pub refresh_async: bool,

    /// Staleness bound for sources that push change notifications
    #[serde(default = "default_fallback_ttl_secs")]
    pub fallback_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            cache_time_secs: default_cache_time_secs(),
            refresh_async: false,
            fallback_ttl_secs: default_fallback_ttl_secs(),
        }
    }
}

impl CacheSettings {
    pub fn validate(&self) -> Result<()> {
        if self.fallback_ttl_secs == 0 {
            return Err(Error::Config(ConfigError::Message(
                "cache.fallback_ttl_secs must be greater than 0".into(),
            )));
        }
        Ok(())
    }

    pub fn to_options(&self) -> CacheOptions {
        CacheOptions {
            ttl: Duration::from_secs(self.cache_time_secs),
            refresh_mode: if self.refresh_async {
                RefreshMode::Async
            } else {
                RefreshMode::Sync
            },
            fallback_ttl: Duration::from_secs(self.fallback_ttl_secs),
        }
    }
}

fn default_cache_time_secs() -> u64 {
    3
}
fn default_fallback_ttl_secs() -> u64 {
    300
}
