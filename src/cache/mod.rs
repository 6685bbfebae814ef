//! Async source cache
//!
//! Wraps a [`Source`] as a [`Layer`](crate::Layer): the last fetched document
//! is served from memory and refreshed when it goes stale or when the source
//! pushes a change signal.
//!
//! ```text
//! get(path) --stale?--> refresh --> source.get(key)
//!                                     -> ContentPipeline::process
//!                                     -> sha256 (unchanged? stop)
//!                                     -> Codec::decode
//!                                     -> publish + notify watchers
//! ```
//!
//! Concurrent refresh requests collapse into a single fetch.

mod async_source_cache;
pub use async_source_cache::*;


use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::source::Source;

/// How a stale read is served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// The reader waits for the refresh and sees its result
    #[default]
    Sync,

    /// The reader gets the cached document while a background refresh runs.
    /// The very first read still waits if nothing was ever published.
    Async,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Age after which the cached document is stale. Zero disables
    /// time-based staleness.
    pub ttl: Duration,

    pub refresh_mode: RefreshMode,

    /// Replaces `ttl` when the source pushes change signals, as a safety
    /// net for lost notifications
    pub fallback_ttl: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            refresh_mode: RefreshMode::default(),
            fallback_ttl: default_fallback_ttl(),
        }
    }
}

fn default_ttl() -> Duration {
    Duration::from_secs(3)
}
fn default_fallback_ttl() -> Duration {
    Duration::from_secs(300)
}

/// Result of a single refresh attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New content was decoded and published
    Updated,
    /// Content fingerprint matched the published one
    Unchanged,
    /// The source holds no content for the key
    Empty,
    /// The source could not be read
    SourceFailed,
    /// The content could not be decoded; the previous document is kept
    DecodeFailed,
    /// Another caller refreshed in the meantime
    Coalesced,
}

/// A source together with the options of every cache created from it
#[derive(Clone)]
pub struct SourceRegistration {
    pub source: Arc<dyn Source>,
    pub options: CacheOptions,
}

impl std::fmt::Debug for SourceRegistration {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SourceRegistration")
            .field("options", &self.options)
            .finish()
    }
}

impl SourceRegistration {
    pub fn new(
        source: Arc<dyn Source>,
        options: CacheOptions,
    ) -> Self {
        Self { source, options }
    }
}
