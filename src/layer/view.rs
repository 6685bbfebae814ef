use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;

use super::ConfigContext;
use super::Layer;
use crate::Notifier;
use crate::Result;

/// Bounded pool of layer-name buffers backing [`LayerView`]s
///
/// Only the buffers are pooled; a view never carries names over from a
/// previous borrow.
#[derive(Debug)]
pub(crate) struct ViewPool {
    buffers: Mutex<Vec<Vec<String>>>,
    capacity: usize,
}

impl ViewPool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Borrows an empty buffer
    pub(crate) fn take(&self) -> Vec<String> {
        let mut buffer = self.buffers.lock().pop().unwrap_or_default();
        buffer.clear();
        buffer
    }

    pub(crate) fn give_back(
        &self,
        mut buffer: Vec<String>,
    ) {
        buffer.clear();
        let mut buffers = self.buffers.lock();
        if buffers.len() < self.capacity {
            buffers.push(buffer);
        } else {
            trace!("view pool full, dropping buffer");
        }
    }

    pub(crate) fn idle(&self) -> usize {
        self.buffers.lock().len()
    }
}

/// Resolution view over an ordered list of layers
///
/// Reads return the first non-null value found in the bound layers; an
/// empty list follows the context's default layers. Writes go to the first
/// bound layer, or `"default"`. Dropping the view returns its buffer to the
/// context's pool.
///
/// ```ignore
/// let view = ctx.layer(&["tenant", "default"]);
/// let port = view.int_or("server.port", 8080);
/// ```
pub struct LayerView {
    context: ConfigContext,
    names: Vec<String>,
}

impl std::fmt::Debug for LayerView {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LayerView")
            .field("layer_names", &self.names)
            .finish()
    }
}

impl LayerView {
    pub(super) fn new(
        context: ConfigContext,
        names: Vec<String>,
    ) -> Self {
        Self { context, names }
    }

    pub fn layer_names(&self) -> &[String] {
        &self.names
    }

    /// Rebinds the view to `names`
    pub fn set_layer_names<S: AsRef<str>>(
        &mut self,
        names: &[S],
    ) {
        self.names.clear();
        self.names
            .extend(names.iter().map(|name| name.as_ref().to_string()));
    }
}

impl Drop for LayerView {
    fn drop(&mut self) {
        let names = std::mem::take(&mut self.names);
        self.context.inner.views.give_back(names);
    }
}

impl Layer for LayerView {
    fn get(
        &self,
        path: &str,
    ) -> Option<Value> {
        self.context.resolve(path, self.names.as_slice())
    }

    fn set(
        &self,
        path: &str,
        value: Value,
    ) -> Result<()> {
        self.context
            .set_in(path, value, self.names.first().map(String::as_str))
    }

    fn watch(
        &self,
        notifier: Notifier,
    ) {
        self.context.watch_layers(notifier, self.names.as_slice())
    }
}
