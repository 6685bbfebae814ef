//! Context bootstrap from [`Settings`]
//!
//! Mounts, in order:
//! 1. the configuration file, either merged once into the `default` layer
//!    (static) or as the refreshing `default-conf-file` layer (alive)
//! 2. the remote store's default key as the `default-conf-remote` layer
//!
//! Each mounted layer is put first in the default resolution order, so the
//! remote default key wins over the file, which wins over `default`.


use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;
use tracing::warn;

use crate::cache::AsyncSourceCache;
use crate::cache::SourceRegistration;
use crate::constants::DEFAULT_FILE_LAYER_NAME;
use crate::constants::DEFAULT_REMOTE_LAYER_NAME;
use crate::constants::FILE_SOURCE_NAME;
use crate::source::FileSource;
use crate::source::KvStore;
use crate::source::RemoteStoreSource;
use crate::Accessors;
use crate::ConfigContext;
use crate::Error;
use crate::Result;
use crate::Settings;

/// Builds a fresh context and initializes it from `settings`.
///
/// `remote_store` is the client of the remote key-value store, if any.
pub fn bootstrap(
    settings: &Settings,
    remote_store: Option<Arc<dyn KvStore>>,
) -> Result<ConfigContext> {
    let ctx = ConfigContext::new();
    init(&ctx, settings, remote_store)?;
    Ok(ctx)
}

/// Registers the bootstrap sources on `ctx` and mounts the configured file
/// and remote default key.
///
/// A configured file that does not exist is fatal.
pub fn init(
    ctx: &ConfigContext,
    settings: &Settings,
    remote_store: Option<Arc<dyn KvStore>>,
) -> Result<()> {
    settings.validate()?;
    let options = settings.cache.to_options();

    ctx.register_source(
        FILE_SOURCE_NAME,
        SourceRegistration::new(Arc::new(FileSource::new()), options),
    );

    if let Some(path) = settings.file.path.as_deref().filter(|p| !p.is_empty()) {
        if !Path::new(path).exists() {
            return Err(Error::Fatal(format!("conf file [{}] not found", path)));
        }

        if settings.file.alive {
            ctx.mount(DEFAULT_FILE_LAYER_NAME, path, FILE_SOURCE_NAME)?;
            ctx.add_default_layer_name(DEFAULT_FILE_LAYER_NAME);
            info!(path, "conf file mounted as live layer");
        } else {
            merge_static_file(ctx, path)?;
        }
    }

    let remote = &settings.remote;
    match remote_store {
        Some(store) => {
            let source = RemoteStoreSource::new(store, remote.channel.as_deref());
            ctx.register_source(
                remote.source_name.clone(),
                SourceRegistration::new(Arc::new(source), options),
            );

            if let Some(key) = remote.default_key.as_deref().filter(|k| !k.is_empty()) {
                ctx.mount(DEFAULT_REMOTE_LAYER_NAME, key, &remote.source_name)?;
                ctx.add_default_layer_name(DEFAULT_REMOTE_LAYER_NAME);
                info!(key, source = %remote.source_name, "remote default key mounted");
            }
        }
        None => {
            if remote.default_key.is_some() {
                warn!("remote.default_key is set but no remote store was given, skipped");
            }
        }
    }

    Ok(())
}

/// Reads the file once and merges it into the `default` layer, so lookups
/// of static settings skip the cache entirely
fn merge_static_file(
    ctx: &ConfigContext,
    path: &str,
) -> Result<()> {
    let cache = AsyncSourceCache::builder(path, Arc::new(FileSource::new()))
        .pipeline(ctx.pipeline().clone())
        .codecs(ctx.codecs().clone())
        .build()?;

    let document = Value::clone(&cache.snapshot());
    if document.is_null() {
        warn!(path, "conf file has no usable content, nothing merged");
        return Ok(());
    }

    ctx.merge(document)?;
    info!(path, "conf file merged into default layer");
    Ok(())
}
