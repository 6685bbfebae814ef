//! Layered Configuration Error Hierarchy
//!
//! Defines the error types surfaced to callers, categorized by the concern
//! that produced them. Transient source failures and decode failures during a
//! background refresh are logged by the cache and never reach this hierarchy;
//! only write paths and explicit operations return them.

use std::path::PathBuf;

use config::ConfigError;

use crate::pipeline::ContentType;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bootstrap settings could not be loaded or failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Structural write errors against a document
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Encoding/decoding of raw configuration content
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Failures reported by a backing source
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Layer registry and resolution failures
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// Operator configuration mistakes that must stop the process
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// A path segment routes through a scalar node
    #[error("Structural conflict at `{path}`: `{segment}` is not a mapping or sequence")]
    StructuralConflict { path: String, segment: String },

    /// A sequence was addressed with a non-numeric segment
    #[error("Invalid sequence index `{segment}` in `{path}`")]
    InvalidIndex { path: String, segment: String },

    /// Writes never extend a sequence
    #[error("Index {index} out of range for sequence of length {len} in `{path}`")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    /// Root writes merge into the document and must carry a mapping
    #[error("Root value must be a mapping, got {0}")]
    RootNotMapping(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML codec error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// No codec registered for the declared content type
    #[error("No codec registered for content type {0:?}")]
    Unsupported(ContentType),
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// File access failures with the offending path
    #[error("I/O error at path {path:?}: {source}")]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The source is read-only or otherwise lacks the operation
    #[error("Operation `{operation}` is not supported by {source_kind} source")]
    Unsupported {
        operation: &'static str,
        source_kind: &'static str,
    },

    /// Remote key-value store failures
    #[error("Store error for key `{key}`: {message}")]
    Store { key: String, message: String },

    /// Pub/sub subscription failures
    #[error("Subscribe to channel `{channel}` failed: {message}")]
    Subscribe { channel: String, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("Layer `{0}` does not exist")]
    NotFound(String),

    #[error("Unsupported config source `{0}`, maybe it is not registered?")]
    UnknownSource(String),

    #[error("Path `{0}` has no value")]
    MissingValue(String),
}
