use config::ConfigError;
use serde::Deserialize;

use crate::constants::REMOTE_SOURCE_NAME;
use crate::Error;
use crate::Result;

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteSettings {
    /// Store key mounted as the `default-conf-remote` layer
    #[serde(default)]
    pub default_key: Option<String>,

    /// Pub/sub channel announcing changed keys
    #[serde(default)]
    pub channel: Option<String>,

    /// Name the remote source is registered under
    #[serde(default = "default_source_name")]
    pub source_name: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            default_key: None,
            channel: None,
            source_name: default_source_name(),
        }
    }
}

impl RemoteSettings {
    pub fn validate(&self) -> Result<()> {
        if self.source_name.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "remote.source_name cannot be empty".into(),
            )));
        }
        Ok(())
    }
}

fn default_source_name() -> String {
    REMOTE_SOURCE_NAME.to_string()
}
