//! Layers and the typed accessor surface
//!
//! A [`Layer`] is anything that answers `get/set/watch` on dotted key paths:
//! a local [`DocumentStore`], a remote-backed
//! [`AsyncSourceCache`](crate::cache::AsyncSourceCache), a [`LayerView`]
//! bound to an ordered list of layers, or the [`ConfigContext`] itself.
//!
//! [`Accessors`] adds the typed reads on top of `get` for every layer.

mod context;
mod view;

pub use context::*;
pub use view::*;


use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::constants::ROOT_KEY;
use crate::convert;
use crate::document::DocumentStore;
use crate::CodecError;
use crate::LayerError;
use crate::Notifier;
use crate::Result;

/// Capability shared by every configuration layer
pub trait Layer: Send + Sync {
    /// Value stored at `path`, `""` being the whole document
    fn get(
        &self,
        path: &str,
    ) -> Option<Value>;

    /// Writes `value` at `path`. A `null` value deletes a mapping key; a
    /// root write deep-merges a mapping.
    fn set(
        &self,
        path: &str,
        value: Value,
    ) -> Result<()>;

    /// Registers a watcher signalled after every change of this layer
    fn watch(
        &self,
        notifier: Notifier,
    );
}

/// Value at `path`, with a stored `null` treated as absent
fn present<L: Layer + ?Sized>(
    layer: &L,
    path: &str,
) -> Option<Value> {
    layer.get(path).filter(|value| !value.is_null())
}

/// Typed reads over [`Layer::get`]
///
/// String and byte defaults apply when the value is absent or empty;
/// numeric and boolean defaults only when it is absent or `null`.
pub trait Accessors: Layer {
    fn exists(
        &self,
        path: &str,
    ) -> bool {
        present(self, path).is_some()
    }

    fn string(
        &self,
        path: &str,
    ) -> String {
        self.get(path)
            .map(|value| convert::to_string(&value))
            .unwrap_or_default()
    }

    fn string_or(
        &self,
        path: &str,
        default: &str,
    ) -> String {
        let value = self.string(path);
        if value.is_empty() {
            return default.to_string();
        }
        value
    }

    fn bytes(
        &self,
        path: &str,
    ) -> Vec<u8> {
        self.string(path).into_bytes()
    }

    fn bytes_or(
        &self,
        path: &str,
        default: &[u8],
    ) -> Vec<u8> {
        let value = self.bytes(path);
        if value.is_empty() {
            return default.to_vec();
        }
        value
    }

    fn float(
        &self,
        path: &str,
    ) -> f64 {
        self.float_or(path, 0.0)
    }

    fn float_or(
        &self,
        path: &str,
        default: f64,
    ) -> f64 {
        present(self, path).map_or(default, |value| convert::to_float(&value))
    }

    fn int(
        &self,
        path: &str,
    ) -> i64 {
        self.int_or(path, 0)
    }

    fn int_or(
        &self,
        path: &str,
        default: i64,
    ) -> i64 {
        present(self, path).map_or(default, |value| convert::to_int(&value))
    }

    fn uint(
        &self,
        path: &str,
    ) -> u64 {
        self.uint_or(path, 0)
    }

    fn uint_or(
        &self,
        path: &str,
        default: u64,
    ) -> u64 {
        present(self, path).map_or(default, |value| convert::to_uint(&value))
    }

    fn bool(
        &self,
        path: &str,
    ) -> bool {
        self.bool_or(path, false)
    }

    fn bool_or(
        &self,
        path: &str,
        default: bool,
    ) -> bool {
        present(self, path).map_or(default, |value| convert::to_bool(&value))
    }

    /// JSON text of the subtree at `path`
    fn json(
        &self,
        path: &str,
    ) -> Result<String> {
        let value = present(self, path).ok_or_else(|| LayerError::MissingValue(path.to_string()))?;
        Ok(serde_json::to_string(&value).map_err(CodecError::from)?)
    }

    /// Decodes the subtree at `path` into `T`
    fn remarshal<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T> {
        let value = present(self, path).ok_or_else(|| LayerError::MissingValue(path.to_string()))?;
        Ok(serde_json::from_value(value).map_err(CodecError::from)?)
    }

    /// Detached store holding a copy of the mapping at `path`
    fn map(
        &self,
        path: &str,
    ) -> Option<DocumentStore> {
        match self.get(path)? {
            Value::Object(map) => Some(DocumentStore::new(map)),
            _ => None,
        }
    }

    /// Deep-merges a mapping into the whole document
    fn merge(
        &self,
        value: Value,
    ) -> Result<()> {
        self.set(ROOT_KEY, value)
    }
}

impl<L: Layer + ?Sized> Accessors for L {}
