use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde_json::Map;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::CacheOptions;
use super::RefreshMode;
use super::RefreshOutcome;
use crate::document::apply_patch;
use crate::document::get_path;
use crate::pipeline::Codec;
use crate::pipeline::CodecRegistry;
use crate::pipeline::ContentPipeline;
use crate::source::Source;
use crate::time::Clock;
use crate::time::SystemClock;
use crate::ContentType;
use crate::Layer;
use crate::Notifier;
use crate::Notifiers;
use crate::Result;

type Fingerprint = [u8; 32];

fn fingerprint(content: &[u8]) -> Fingerprint {
    Sha256::digest(content).into()
}

/// Mutable refresh state, guarded by the mutex that serializes the refresh
/// and write paths
#[derive(Debug, Default)]
struct CacheState {
    fingerprint: Option<Fingerprint>,
}

struct CacheInner {
    key: String,
    source: Arc<dyn Source>,
    content_type: ContentType,
    codec: Arc<dyn Codec>,
    pipeline: Arc<ContentPipeline>,
    clock: Arc<dyn Clock>,
    refresh_mode: RefreshMode,
    ttl: Duration,

    document: ArcSwap<Value>,
    state: Mutex<CacheState>,

    /// Clock nanoseconds at the start of the last refresh, 0 = never
    refreshed_at: AtomicU64,
    /// Bumped after every executed refresh
    generation: AtomicU64,
    /// A document has been published at least once
    initialized: AtomicBool,
    /// A background refresh is queued or running
    refresh_scheduled: AtomicBool,

    notifiers: Notifiers,
}

impl CacheInner {
    fn is_stale(&self) -> bool {
        if self.ttl.is_zero() {
            return false;
        }
        let refreshed_at = self.refreshed_at.load(Ordering::SeqCst);
        let age = self.clock.now_nanos().saturating_sub(refreshed_at);
        u128::from(age) > self.ttl.as_nanos()
    }

    /// Runs one refresh under the state lock.
    ///
    /// With `observed` set, the fetch is skipped when any refresh completed
    /// after the caller sampled the generation: the caller then reads that
    /// refresh's result instead.
    fn refresh(
        &self,
        observed: Option<u64>,
    ) -> RefreshOutcome {
        let mut state = self.state.lock();

        if let Some(observed) = observed {
            if self.generation.load(Ordering::SeqCst) != observed {
                trace!(key = %self.key, "refresh coalesced");
                return RefreshOutcome::Coalesced;
            }
        }

        let outcome = self.refresh_locked(&mut state);
        self.generation.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    fn refresh_locked(
        &self,
        state: &mut CacheState,
    ) -> RefreshOutcome {
        self.refreshed_at
            .store(self.clock.now_nanos(), Ordering::SeqCst);

        let raw = match self.source.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                warn!(key = %self.key, "source returned no content, keeping cached document");
                return RefreshOutcome::Empty;
            }
            Err(e) => {
                warn!(key = %self.key, "source fetch failed, keeping cached document: {}", e);
                return RefreshOutcome::SourceFailed;
            }
        };

        let processed = self.pipeline.process(&raw, self.content_type);
        if processed.is_empty() {
            warn!(key = %self.key, "content empty after processing, keeping cached document");
            return RefreshOutcome::Empty;
        }

        let fingerprint = fingerprint(&processed);
        if state.fingerprint == Some(fingerprint) {
            trace!(key = %self.key, "content unchanged");
            return RefreshOutcome::Unchanged;
        }

        let document = match self.codec.decode(&processed) {
            Ok(document) => document,
            Err(e) => {
                error!(key = %self.key, content_type = ?self.content_type, "decode failed, keeping cached document: {}", e);
                return RefreshOutcome::DecodeFailed;
            }
        };

        self.publish(state, document, fingerprint);
        debug!(key = %self.key, "cached document updated");
        RefreshOutcome::Updated
    }

    fn publish(
        &self,
        state: &mut CacheState,
        document: Value,
        fingerprint: Fingerprint,
    ) {
        self.document.store(Arc::new(document));
        state.fingerprint = Some(fingerprint);
        self.initialized.store(true, Ordering::SeqCst);
        self.notifiers.notify();
    }

    fn write(
        &self,
        path: &str,
        value: Value,
    ) -> Result<()> {
        let mut state = self.state.lock();

        let mut next = Value::clone(&self.document.load());
        if next.is_null() {
            next = Value::Object(Map::new());
        }
        apply_patch(&mut next, path, value)?;

        let encoded = self.codec.encode(&next)?;
        self.source.set(&self.key, &encoded)?;

        // Our own write echoing back from the source must look unchanged
        let fingerprint = fingerprint(&self.pipeline.process(&encoded, self.content_type));
        self.publish(&mut state, next, fingerprint);
        Ok(())
    }
}

/// Builds an [`AsyncSourceCache`]
pub struct CacheBuilder {
    key: String,
    source: Arc<dyn Source>,
    options: CacheOptions,
    pipeline: Arc<ContentPipeline>,
    codecs: CodecRegistry,
    clock: Arc<dyn Clock>,
}

impl CacheBuilder {
    pub fn options(
        mut self,
        options: CacheOptions,
    ) -> Self {
        self.options = options;
        self
    }

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

    /// Resolves the codec, performs the initial fetch and, when the source
    /// pushes change signals and a Tokio runtime is available, starts the
    /// push listener.
    ///
    /// Only a missing codec fails: an unreachable source leaves the cache
    /// empty until a later refresh succeeds.
    pub fn build(self) -> Result<AsyncSourceCache> {
        let content_type = self.source.content_type(&self.key);
        let codec = self.codecs.get(content_type)?;

        let push = self.source.watch(&self.key);
        let ttl = match push {
            Some(_) => self.options.fallback_ttl,
            None => self.options.ttl,
        };

        let inner = Arc::new(CacheInner {
            key: self.key,
            source: self.source,
            content_type,
            codec,
            pipeline: self.pipeline,
            clock: self.clock,
            refresh_mode: self.options.refresh_mode,
            ttl,
            document: ArcSwap::from_pointee(Value::Null),
            state: Mutex::new(CacheState::default()),
            refreshed_at: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
            refresh_scheduled: AtomicBool::new(false),
            notifiers: Notifiers::new(),
        });

        let outcome = inner.refresh(None);
        info!(key = %inner.key, ?content_type, ?ttl, ?outcome, "async source cache created");

        let cache = AsyncSourceCache {
            inner,
            shutdown: CancellationToken::new(),
        };

        if let Some(receiver) = push {
            match Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(listen(
                        cache.inner.clone(),
                        receiver,
                        cache.shutdown.clone(),
                    ));
                }
                Err(_) => {
                    warn!(key = %cache.inner.key, "no async runtime, push signals ignored until fallback TTL expires");
                }
            }
        }

        Ok(cache)
    }
}

/// Remote-backed layer caching the decoded document stored under one source
/// key
///
/// Reads never fail: source and decode errors are logged and the last good
/// document keeps being served.
pub struct AsyncSourceCache {
    inner: Arc<CacheInner>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for AsyncSourceCache {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("AsyncSourceCache")
            .field("key", &self.inner.key)
            .field("content_type", &self.inner.content_type)
            .field("refresh_mode", &self.inner.refresh_mode)
            .field("ttl", &self.inner.ttl)
            .field("generation", &self.inner.generation.load(Ordering::Relaxed))
            .finish()
    }
}

impl AsyncSourceCache {
    pub fn builder(
        key: impl Into<String>,
        source: Arc<dyn Source>,
    ) -> CacheBuilder {
        CacheBuilder {
            key: key.into(),
            source,
            options: CacheOptions::default(),
            pipeline: Arc::new(ContentPipeline::default()),
            codecs: CodecRegistry::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn content_type(&self) -> ContentType {
        self.inner.content_type
    }

    /// Effective TTL, after the push fallback was applied
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Returns the currently published document without a staleness check
    pub fn snapshot(&self) -> Arc<Value> {
        self.inner.document.load_full()
    }

    /// Refreshes immediately, regardless of staleness
    pub fn refresh_now(&self) -> RefreshOutcome {
        self.inner.refresh(None)
    }

    /// Stops the push listener. Reads keep working on TTL expiry.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn ensure_fresh(&self) {
        let inner = &self.inner;
        // Sampled before the staleness check, see `CacheInner::refresh`
        let generation = inner.generation.load(Ordering::SeqCst);
        if !inner.is_stale() {
            return;
        }

        // The reader's current runtime; without one the refresh runs inline
        let runtime = match inner.refresh_mode {
            RefreshMode::Async if inner.initialized.load(Ordering::SeqCst) => Handle::try_current().ok(),
            _ => None,
        };

        match runtime {
            Some(runtime) => {
                if inner.refresh_scheduled.swap(true, Ordering::SeqCst) {
                    return;
                }
                trace!(key = %inner.key, "stale, scheduling background refresh");
                let scheduled = ScheduledRefresh(inner.clone());
                runtime.spawn_blocking(move || {
                    let scheduled = scheduled;
                    scheduled.0.refresh(Some(generation));
                });
            }
            None => {
                trace!(key = %inner.key, "stale, refreshing");
                inner.refresh(Some(generation));
            }
        }
    }
}

/// Clears `refresh_scheduled` once the background refresh is over, or when
/// the task is dropped without running
struct ScheduledRefresh(Arc<CacheInner>);

impl Drop for ScheduledRefresh {
    fn drop(&mut self) {
        self.0.refresh_scheduled.store(false, Ordering::SeqCst);
    }
}

impl Drop for AsyncSourceCache {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn listen(
    inner: Arc<CacheInner>,
    mut receiver: broadcast::Receiver<()>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(key = %inner.key, "push listener stopped");
                return;
            }
            signal = receiver.recv() => {
                match signal {
                    Ok(()) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(key = %inner.key, skipped, "push signals lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!(key = %inner.key, "push channel closed, listener exits");
                        return;
                    }
                }

                let refresher = inner.clone();
                match tokio::task::spawn_blocking(move || refresher.refresh(None)).await {
                    Ok(outcome) => debug!(key = %inner.key, ?outcome, "push-triggered refresh"),
                    Err(e) => error!(key = %inner.key, "push-triggered refresh failed: {:?}", e),
                }
            }
        }
    }
}

impl Layer for AsyncSourceCache {
    fn get(
        &self,
        path: &str,
    ) -> Option<Value> {
        self.ensure_fresh();
        let document = self.inner.document.load();
        get_path(&document, path).cloned()
    }

    /// Applies the write to a copy of the document and pushes the encoded
    /// result to the source. The cache only changes once the source accepted
    /// the write.
    fn set(
        &self,
        path: &str,
        value: Value,
    ) -> Result<()> {
        self.inner.write(path, value)
    }

    fn watch(
        &self,
        notifier: Notifier,
    ) {
        self.inner.notifiers.register(notifier);
    }
}
