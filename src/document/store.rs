use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde_json::Map;
use serde_json::Value;
use tracing::trace;

use super::apply_patch;
use super::get_path;
use crate::Layer;
use crate::Notifier;
use crate::Notifiers;
use crate::Result;

/// Mutation discipline of a [`DocumentStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Every write clones the published document, patches the clone and
    /// atomically swaps it in. Safe under concurrent readers and writers;
    /// O(document size) per write.
    #[default]
    Synchronized,

    /// Writes patch the live document in place, without locking and without
    /// cloning unless a reader still holds a snapshot. The caller must
    /// guarantee that no other thread reads or writes the store meanwhile.
    Unsynchronized,
}

/// In-memory structured value store
///
/// Readers load the published document without locking and never observe a
/// partially applied write.
#[derive(Debug)]
pub struct DocumentStore {
    document: ArcSwap<Value>,
    write_mode: WriteMode,
    write_lock: Mutex<()>,
    notifiers: Notifiers,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(Map::new())
    }
}

impl DocumentStore {
    pub fn new(map: Map<String, Value>) -> Self {
        Self::with_mode(map, WriteMode::Synchronized)
    }

    pub fn with_mode(
        map: Map<String, Value>,
        write_mode: WriteMode,
    ) -> Self {
        Self {
            document: ArcSwap::from_pointee(Value::Object(map)),
            write_mode,
            write_lock: Mutex::new(()),
            notifiers: Notifiers::new(),
        }
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Returns the currently published document
    pub fn snapshot(&self) -> Arc<Value> {
        self.document.load_full()
    }

    fn write(
        &self,
        path: &str,
        value: Value,
    ) -> Result<()> {
        match self.write_mode {
            WriteMode::Synchronized => {
                let _guard = self.write_lock.lock();
                let mut next = Value::clone(&self.document.load());
                apply_patch(&mut next, path, value)?;
                self.document.store(Arc::new(next));
            }
            WriteMode::Unsynchronized => {
                let mut live = self.document.swap(Arc::new(Value::Null));
                let result = apply_patch(Arc::make_mut(&mut live), path, value);
                self.document.store(live);
                result?;
            }
        }
        Ok(())
    }
}

impl Layer for DocumentStore {
    fn get(
        &self,
        path: &str,
    ) -> Option<Value> {
        let document = self.document.load();
        get_path(&document, path).cloned()
    }

    fn set(
        &self,
        path: &str,
        value: Value,
    ) -> Result<()> {
        self.write(path, value)?;
        trace!(path, "document updated");
        self.notifiers.notify();
        Ok(())
    }

    fn watch(
        &self,
        notifier: Notifier,
    ) {
        self.notifiers.register(notifier);
    }
}
