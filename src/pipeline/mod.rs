//! Content pipeline
//!
//! Raw bytes fetched from a source pass through an ordered chain of
//! transforms before they are fingerprinted and decoded:
//!
//! ```text
//! source.get() -> transform_1 -> transform_2 -> ... -> sha256 -> codec.decode()
//! ```
//!
//! Each transform receives the declared [`ContentType`] and decides for
//! itself whether it applies. The default chain only strips line comments
//! from JSON content.

mod codec;
pub use codec::*;


use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use tracing::trace;

/// Format of raw configuration content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Json,
    Yaml,
}

impl ContentType {
    /// Detects the content type from a file name: `.yml`/`.yaml` is YAML,
    /// anything else is JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("yml") | Some("yaml") => ContentType::Yaml,
            _ => ContentType::Json,
        }
    }
}

/// Byte transform applied to raw content before decoding
pub type Transform = Arc<dyn Fn(&[u8], ContentType) -> Vec<u8> + Send + Sync>;

/// Ordered chain of raw content transforms
pub struct ContentPipeline {
    transforms: RwLock<Vec<Transform>>,
}

impl std::fmt::Debug for ContentPipeline {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ContentPipeline")
            .field("transforms", &self.transforms.read().len())
            .finish()
    }
}

impl Default for ContentPipeline {
    fn default() -> Self {
        let pipeline = Self::empty();
        pipeline.register(strip_json_comments);
        pipeline
    }
}

impl ContentPipeline {
    /// Pipeline without any transform
    pub fn empty() -> Self {
        Self {
            transforms: RwLock::new(Vec::new()),
        }
    }

    /// Appends a transform. It applies to every fetch processed after this
    /// call, for all sources sharing this pipeline.
    pub fn register<F>(
        &self,
        transform: F,
    ) where
        F: Fn(&[u8], ContentType) -> Vec<u8> + Send + Sync + 'static,
    {
        self.transforms.write().push(Arc::new(transform));
    }

    pub fn len(&self) -> usize {
        self.transforms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `raw` through every transform in registration order.
    ///
    /// Empty input short-circuits to an empty buffer.
    pub fn process(
        &self,
        raw: &[u8],
        content_type: ContentType,
    ) -> Vec<u8> {
        if raw.is_empty() {
            return Vec::new();
        }

        // Transforms may be slow; don't hold the lock while running them
        let transforms: Vec<Transform> = self.transforms.read().clone();

        let mut processed = raw.to_vec();
        for transform in transforms {
            processed = transform(&processed, content_type);
        }
        processed
    }
}

lazy_static! {
    static ref JSON_COMMENT_REGEXES: [Regex; 2] = [
        // trailing `// ...` without quotes up to end of line
        Regex::new(r#"(?m)//[^"]+?$"#).expect("valid trailing comment regex"),
        // whole-line comments
        Regex::new(r"(?m)^\s*//.*?$").expect("valid line comment regex"),
    ];
}

/// Strips `//` line comments from JSON content.
///
/// Non-JSON content passes through unchanged. The stripped text is only
/// used when it still parses as JSON; otherwise the original bytes are
/// returned.
pub fn strip_json_comments(
    raw: &[u8],
    content_type: ContentType,
) -> Vec<u8> {
    if content_type != ContentType::Json {
        return raw.to_vec();
    }

    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(_) => return raw.to_vec(),
    };

    let mut stripped = text.to_string();
    for regex in JSON_COMMENT_REGEXES.iter() {
        stripped = regex.replace_all(&stripped, "").into_owned();
    }

    if stripped == text {
        return raw.to_vec();
    }

    match serde_json::from_str::<serde::de::IgnoredAny>(&stripped) {
        Ok(_) => stripped.into_bytes(),
        Err(e) => {
            trace!("comment stripping broke JSON ({}), keeping original", e);
            raw.to_vec()
        }
    }
}
