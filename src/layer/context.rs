use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use super::Accessors;
use super::Layer;
use super::LayerView;
use super::ViewPool;
use crate::cache::AsyncSourceCache;
use crate::cache::SourceRegistration;
use crate::constants::DEFAULT_CONF_SOURCE_KEY;
use crate::constants::DEFAULT_LAYER_NAME;
use crate::constants::DEFAULT_VIEW_POOL_CAPACITY;
use crate::constants::REMOTE_SOURCE_NAME;
use crate::document::DocumentStore;
use crate::pipeline::CodecRegistry;
use crate::pipeline::ContentPipeline;
use crate::time::Clock;
use crate::time::SystemClock;
use crate::LayerError;
use crate::Notifier;
use crate::Result;

pub(super) struct ContextInner {
    layers: DashMap<String, Arc<dyn Layer>>,
    /// Resolution order when no layer is named, first entry wins
    default_names: ArcSwap<Vec<String>>,
    sources: DashMap<String, SourceRegistration>,
    pipeline: Arc<ContentPipeline>,
    codecs: CodecRegistry,
    clock: Arc<dyn Clock>,
    pub(super) views: ViewPool,
}

/// Registry of named layers and the resolver over them
///
/// Cloning is cheap and every clone shares the same registry. A fresh
/// context holds an empty local layer named `"default"`, which is also the
/// only default layer.
#[derive(Clone)]
pub struct ConfigContext {
    pub(super) inner: Arc<ContextInner>,
}

impl std::fmt::Debug for ConfigContext {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConfigContext")
            .field("layers", &self.layer_names())
            .field("default_layer_names", &self.default_layer_names())
            .finish()
    }
}

impl Default for ConfigContext {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ContextBuilder {
    pipeline: Arc<ContentPipeline>,
    codecs: CodecRegistry,
    clock: Arc<dyn Clock>,
    view_pool_capacity: usize,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            pipeline: Arc::new(ContentPipeline::default()),
            codecs: CodecRegistry::default(),
            clock: Arc::new(SystemClock),
            view_pool_capacity: DEFAULT_VIEW_POOL_CAPACITY,
        }
    }
}

impl ContextBuilder {
    /// Transform chain shared by every cache the context creates
    pub fn pipeline(
        mut self,
        pipeline: Arc<ContentPipeline>,
    ) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn codecs(
        mut self,
        codecs: CodecRegistry,
    ) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn clock(
        mut self,
        clock: Arc<dyn Clock>,
    ) -> Self {
        self.clock = clock;
        self
    }

    /// Number of idle view buffers kept for reuse
    pub fn view_pool_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.view_pool_capacity = capacity;
        self
    }

    pub fn build(self) -> ConfigContext {
        let layers: DashMap<String, Arc<dyn Layer>> = DashMap::new();
        layers.insert(DEFAULT_LAYER_NAME.to_string(), Arc::new(DocumentStore::default()));

        ConfigContext {
            inner: Arc::new(ContextInner {
                layers,
                default_names: ArcSwap::from_pointee(vec![DEFAULT_LAYER_NAME.to_string()]),
                sources: DashMap::new(),
                pipeline: self.pipeline,
                codecs: self.codecs,
                clock: self.clock,
                views: ViewPool::new(self.view_pool_capacity),
            }),
        }
    }
}

impl ConfigContext {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    pub fn pipeline(&self) -> &Arc<ContentPipeline> {
        &self.inner.pipeline
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.inner.codecs
    }

    /// Registers `layer` under `name`, replacing any previous layer
    pub fn add_layer(
        &self,
        name: impl Into<String>,
        layer: Arc<dyn Layer>,
    ) {
        let name = name.into();
        info!(layer = %name, "layer added");
        self.inner.layers.insert(name, layer);
    }

    pub fn remove_layer(
        &self,
        name: &str,
    ) -> Option<Arc<dyn Layer>> {
        let removed = self.inner.layers.remove(name).map(|(_, layer)| layer);
        if removed.is_some() {
            info!(layer = %name, "layer removed");
        }
        removed
    }

    pub fn layer_instance(
        &self,
        name: &str,
    ) -> Option<Arc<dyn Layer>> {
        self.inner.layers.get(name).map(|layer| layer.value().clone())
    }

    /// Names of every registered layer, sorted
    pub fn layer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.layers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Puts `name` first in the default resolution order, removing any
    /// earlier occurrence
    pub fn add_default_layer_name(
        &self,
        name: &str,
    ) {
        self.inner.default_names.rcu(|names| {
            let mut next = Vec::with_capacity(names.len() + 1);
            next.push(name.to_string());
            next.extend(names.iter().filter(|n| n.as_str() != name).cloned());
            next
        });
        debug!(layer = %name, "default layer name added");
    }

    pub fn remove_default_layer_name(
        &self,
        name: &str,
    ) {
        self.inner.default_names.rcu(|names| {
            names
                .iter()
                .filter(|n| n.as_str() != name)
                .cloned()
                .collect::<Vec<_>>()
        });
        debug!(layer = %name, "default layer name removed");
    }

    /// Current default resolution order
    pub fn default_layer_names(&self) -> Arc<Vec<String>> {
        self.inner.default_names.load_full()
    }

    /// Makes a source available to [`ConfigContext::load`] under `name`
    pub fn register_source(
        &self,
        name: impl Into<String>,
        registration: SourceRegistration,
    ) {
        let name = name.into();
        info!(source = %name, options = ?registration.options, "config source registered");
        self.inner.sources.insert(name, registration);
    }

    pub fn source(
        &self,
        name: &str,
    ) -> Option<SourceRegistration> {
        self.inner.sources.get(name).map(|entry| entry.value().clone())
    }

    /// Mounts the document stored under `path` in a registered source as a
    /// layer named `path`, and returns a view bound to it.
    ///
    /// The source defaults to the `default_conf_source` setting of the
    /// default layers, then to `"remote"`. An existing layer named `path` is
    /// reused as is.
    pub fn load(
        &self,
        path: &str,
        source: Option<&str>,
    ) -> Result<LayerView> {
        if !self.inner.layers.contains_key(path) {
            let source_name = match source {
                Some(name) => name.to_string(),
                None => self.string_or(DEFAULT_CONF_SOURCE_KEY, REMOTE_SOURCE_NAME),
            };
            let cache = self.build_cache(path, &source_name)?;

            // A concurrent load of the same path may have won meanwhile
            match self.inner.layers.entry(path.to_string()) {
                Entry::Occupied(_) => debug!(layer = %path, "layer loaded concurrently, keeping the first"),
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(cache));
                    info!(layer = %path, source = %source_name, "remote layer loaded");
                }
            }
        }

        Ok(self.layer(&[path]))
    }

    /// Mounts the document stored under `key` in the source registered as
    /// `source_name` as layer `layer_name`, replacing any layer of that name
    pub fn mount(
        &self,
        layer_name: &str,
        key: &str,
        source_name: &str,
    ) -> Result<()> {
        let cache = self.build_cache(key, source_name)?;
        self.add_layer(layer_name, Arc::new(cache));
        Ok(())
    }

    fn build_cache(
        &self,
        key: &str,
        source_name: &str,
    ) -> Result<AsyncSourceCache> {
        let registration = self
            .source(source_name)
            .ok_or_else(|| LayerError::UnknownSource(source_name.to_string()))?;

        AsyncSourceCache::builder(key, registration.source)
            .options(registration.options)
            .pipeline(self.inner.pipeline.clone())
            .codecs(self.inner.codecs.clone())
            .clock(self.inner.clock.clone())
            .build()
    }

    /// First non-null value at `path` across `names`, in order. An empty
    /// `names` resolves through the default layers.
    pub fn resolve<S: AsRef<str>>(
        &self,
        path: &str,
        names: &[S],
    ) -> Option<Value> {
        if names.is_empty() {
            let defaults = self.default_layer_names();
            return self.resolve_in(path, defaults.as_slice());
        }
        self.resolve_in(path, names)
    }

    fn resolve_in<S: AsRef<str>>(
        &self,
        path: &str,
        names: &[S],
    ) -> Option<Value> {
        names
            .iter()
            .filter_map(|name| self.layer_instance(name.as_ref()))
            .find_map(|layer| layer.get(path).filter(|value| !value.is_null()))
    }

    /// Writes to the layer named `layer`, `"default"` when unnamed
    pub fn set_in(
        &self,
        path: &str,
        value: Value,
        layer: Option<&str>,
    ) -> Result<()> {
        let name = layer.unwrap_or(DEFAULT_LAYER_NAME);
        let target = self
            .layer_instance(name)
            .ok_or_else(|| LayerError::NotFound(name.to_string()))?;
        target.set(path, value)
    }

    /// Registers `notifier` on each layer in `names` (the default layers when
    /// empty). Unknown names are skipped.
    pub fn watch_layers<S: AsRef<str>>(
        &self,
        notifier: Notifier,
        names: &[S],
    ) {
        if names.is_empty() {
            let defaults = self.default_layer_names();
            self.watch_in(notifier, defaults.as_slice());
        } else {
            self.watch_in(notifier, names);
        }
    }

    fn watch_in<S: AsRef<str>>(
        &self,
        notifier: Notifier,
        names: &[S],
    ) {
        for layer in names.iter().filter_map(|name| self.layer_instance(name.as_ref())) {
            layer.watch(notifier.clone());
        }
    }

    /// View resolving through `names` in order; an empty list follows the
    /// default layers as they change
    pub fn layer<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> LayerView {
        let mut view = LayerView::new(self.clone(), self.inner.views.take());
        view.set_layer_names(names);
        view
    }

    /// View resolving through the current default layers
    pub fn default_view(&self) -> LayerView {
        self.layer::<&str>(&[])
    }

    /// Drops every layer and source. Remote layers stop their push
    /// listeners once no view or caller holds them anymore.
    pub fn shutdown(&self) {
        self.inner.layers.clear();
        self.inner.sources.clear();
        info!("config context shut down");
    }
}

impl Layer for ConfigContext {
    fn get(
        &self,
        path: &str,
    ) -> Option<Value> {
        self.resolve::<&str>(path, &[])
    }

    fn set(
        &self,
        path: &str,
        value: Value,
    ) -> Result<()> {
        self.set_in(path, value, None)
    }

    fn watch(
        &self,
        notifier: Notifier,
    ) {
        self.watch_layers::<&str>(notifier, &[])
    }
}
