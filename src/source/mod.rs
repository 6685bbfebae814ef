//! Backing sources of remote-cached layers
//!
//! A [`Source`] serves whole documents as raw bytes under a key (a file
//! path, a key in a remote store, ...). Sources know nothing about caching,
//! decoding or key paths: the async source cache drives them.
//!
//! Provided implementations:
//! - [`FileSource`] - local files, poll-only, read-only
//! - [`RemoteStoreSource`] - single keys of a [`KvStore`], with optional
//!   pub/sub change notifications
//! - [`MemoryKvStore`] - in-process [`KvStore`]

mod file_source;
mod remote_source;

pub use file_source::*;
pub use remote_source::*;

#[cfg(test)]
mod file_source_test;

#[cfg(test)]
use mockall::automock;
use tokio::sync::broadcast;

use crate::ContentType;
use crate::Result;

#[cfg_attr(test, automock)]
pub trait Source: Send + Sync + 'static {
    /// Format of the content stored under `key`
    fn content_type(
        &self,
        key: &str,
    ) -> ContentType;

    /// Fetches the raw content stored under `key`.
    ///
    /// `Ok(None)` means the key holds no content. Errors are treated as
    /// transient by callers.
    fn get(
        &self,
        key: &str,
    ) -> Result<Option<Vec<u8>>>;

    /// Replaces the raw content stored under `key`
    fn set(
        &self,
        key: &str,
        content: &[u8],
    ) -> Result<()>;

    /// Push channel signalled whenever `key` changes, if the source supports
    /// change notifications
    fn watch(
        &self,
        key: &str,
    ) -> Option<broadcast::Receiver<()>>;
}
