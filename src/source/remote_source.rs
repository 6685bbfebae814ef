use std::sync::Arc;

use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::Source;
use crate::ContentType;
use crate::Result;

/// Capacity of the per-channel pub/sub buffers of [`MemoryKvStore`]
const CHANNEL_CAPACITY: usize = 64;

/// Client boundary of a remote key-value store
///
/// The wire protocol lives behind this trait. Payloads published on a
/// subscribed channel are the names of the keys that changed.
#[cfg_attr(test, automock)]
pub trait KvStore: Send + Sync + 'static {
    fn get(
        &self,
        key: &str,
    ) -> Result<Option<Vec<u8>>>;

    fn set(
        &self,
        key: &str,
        value: &[u8],
    ) -> Result<()>;

    fn subscribe(
        &self,
        channel: &str,
    ) -> Result<broadcast::Receiver<String>>;
}

/// In-process key-value store with pub/sub channels
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: DashMap<String, Vec<u8>>,
    channels: DashMap<String, broadcast::Sender<String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `payload` on `channel`.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(
        &self,
        channel: &str,
        payload: &str,
    ) -> usize {
        match self.channels.get(channel) {
            Some(sender) => sender.send(payload.to_string()).unwrap_or(0),
            None => 0,
        }
    }
}

impl KvStore for MemoryKvStore {
    fn get(
        &self,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(
        &self,
        key: &str,
        value: &[u8],
    ) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn subscribe(
        &self,
        channel: &str,
    ) -> Result<broadcast::Receiver<String>> {
        let sender = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        Ok(sender.subscribe())
    }
}

/// Source backed by single keys of a remote key-value store
///
/// When created with a subscription channel, every payload published on that
/// channel names a changed key, and the key's watchers are signalled.
pub struct RemoteStoreSource {
    store: Arc<dyn KvStore>,
    notify_enabled: bool,
    key_channels: Arc<DashMap<String, broadcast::Sender<()>>>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for RemoteStoreSource {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RemoteStoreSource")
            .field("notify_enabled", &self.notify_enabled)
            .field("watched_keys", &self.key_channels.len())
            .finish()
    }
}

impl RemoteStoreSource {
    /// Wraps `store`. Change notifications require `channel` and a running
    /// Tokio runtime; without either, watchers fall back to TTL polling.
    pub fn new(
        store: Arc<dyn KvStore>,
        channel: Option<&str>,
    ) -> Self {
        let mut source = Self {
            store,
            notify_enabled: false,
            key_channels: Arc::new(DashMap::new()),
            shutdown: CancellationToken::new(),
        };

        if let Some(channel) = channel.filter(|c| !c.is_empty()) {
            source.notify_enabled = source.subscribe(channel);
        }

        info!(
            channel = channel.unwrap_or_default(),
            notify_enabled = source.notify_enabled,
            "remote store source created"
        );
        source
    }

    pub fn notify_enabled(&self) -> bool {
        self.notify_enabled
    }

    fn subscribe(
        &self,
        channel: &str,
    ) -> bool {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(channel, "no async runtime for subscription, notifications disabled: {}", e);
                return false;
            }
        };

        let receiver = match self.store.subscribe(channel) {
            Ok(receiver) => receiver,
            Err(e) => {
                error!(channel, "remote store subscribe failed: {:?}", e);
                return false;
            }
        };

        runtime.spawn(forward_notifications(
            channel.to_string(),
            receiver,
            self.key_channels.clone(),
            self.shutdown.clone(),
        ));
        true
    }
}

impl Drop for RemoteStoreSource {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn notify_key(
    key_channels: &DashMap<String, broadcast::Sender<()>>,
    key: &str,
) {
    if let Some(sender) = key_channels.get(key) {
        debug!(key, "remote key changed, notifying");
        // No receiver left is fine: nobody is watching anymore
        let _ = sender.send(());
    }
}

async fn forward_notifications(
    channel: String,
    mut receiver: broadcast::Receiver<String>,
    key_channels: Arc<DashMap<String, broadcast::Sender<()>>>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(%channel, "remote store subscription stopped");
                return;
            }
            message = receiver.recv() => match message {
                Ok(key) => notify_key(&key_channels, &key),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%channel, skipped, "subscription lagged, notifying every watched key");
                    for entry in key_channels.iter() {
                        let _ = entry.value().send(());
                    }
                }
                Err(RecvError::Closed) => {
                    warn!(%channel, "subscription channel closed");
                    return;
                }
            }
        }
    }
}

impl Source for RemoteStoreSource {
    fn content_type(
        &self,
        _key: &str,
    ) -> ContentType {
        ContentType::Json
    }

    fn get(
        &self,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        match self.store.get(key) {
            Ok(Some(value)) if !value.is_empty() => Ok(Some(value)),
            Ok(_) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(
        &self,
        key: &str,
        content: &[u8],
    ) -> Result<()> {
        self.store.set(key, content)?;

        if self.notify_enabled {
            notify_key(&self.key_channels, key);
        }
        Ok(())
    }

    fn watch(
        &self,
        key: &str,
    ) -> Option<broadcast::Receiver<()>> {
        if !self.notify_enabled {
            return None;
        }

        let sender = self
            .key_channels
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(1).0);
        Some(sender.subscribe())
    }
}
