use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::ContentType;
use crate::CodecError;
use crate::Result;

/// Structured encoding of a document
pub trait Codec: Send + Sync {
    fn encode(
        &self,
        value: &Value,
    ) -> Result<Vec<u8>>;

    fn decode(
        &self,
        raw: &[u8],
    ) -> Result<Value>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(
        &self,
        value: &Value,
    ) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CodecError::Json(e).into())
    }

    fn decode(
        &self,
        raw: &[u8],
    ) -> Result<Value> {
        serde_json::from_slice(raw).map_err(|e| CodecError::Json(e).into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn encode(
        &self,
        value: &Value,
    ) -> Result<Vec<u8>> {
        serde_yaml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| CodecError::Yaml(e).into())
    }

    fn decode(
        &self,
        raw: &[u8],
    ) -> Result<Value> {
        serde_yaml::from_slice(raw).map_err(|e| CodecError::Yaml(e).into())
    }
}

/// Codecs keyed by content type
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: HashMap<ContentType, Arc<dyn Codec>>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("content_types", &self.codecs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ContentType::Json, Arc::new(JsonCodec));
        registry.register(ContentType::Yaml, Arc::new(YamlCodec));
        registry
    }
}

impl CodecRegistry {
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Registers (or replaces) the codec for `content_type`
    pub fn register(
        &mut self,
        content_type: ContentType,
        codec: Arc<dyn Codec>,
    ) {
        self.codecs.insert(content_type, codec);
    }

    pub fn get(
        &self,
        content_type: ContentType,
    ) -> Result<Arc<dyn Codec>> {
        self.codecs
            .get(&content_type)
            .cloned()
            .ok_or_else(|| CodecError::Unsupported(content_type).into())
    }
}
