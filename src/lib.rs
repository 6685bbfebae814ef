//! Layered configuration
//!
//! Configuration values are read through an ordered list of named layers.
//! Local layers are in-memory documents; remote layers cache a document
//! fetched from a file or a key-value store and refresh it on TTL expiry or
//! on change notifications.
//!
//! ```ignore
//! use layerconf::Accessors;
//!
//! let ctx = layerconf::ConfigContext::new();
//! ctx.merge(serde_json::json!({ "db": { "port": 5432 } }))?;
//! assert_eq!(ctx.int("db.port"), 5432);
//! ```

pub mod bootstrap;
pub mod cache;
mod config;
pub mod constants;
pub mod document;
mod errors;
mod layer;
pub mod pipeline;
pub mod source;
pub mod utils;
mod watch;

pub use errors::*;
pub use layer::*;
pub use pipeline::ContentType;
pub use self::config::*;
pub use utils::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
