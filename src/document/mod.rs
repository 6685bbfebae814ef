//! Structured configuration documents
//!
//! A document is a [`serde_json::Value`] tree of string-keyed mappings,
//! sequences and scalars, always addressed by a dotted key path:
//!
//! - `""` addresses the whole document
//! - `"a.b.c"` descends through nested mappings
//! - numeric segments (`"servers.0.host"`) index into sequences
//!
//! The functions here operate on a document in place. Publication of a
//! document to concurrent readers is the job of [`DocumentStore`] and the
//! async source cache.

mod store;
pub use store::*;

#[cfg(test)]
mod store_test;

use serde_json::Map;
use serde_json::Value;

use crate::constants::PATH_SEPARATOR;
use crate::constants::ROOT_KEY;
use crate::DocumentError;

/// Looks up `path` inside `doc`.
///
/// Returns `None` when any segment is missing, when a sequence segment is
/// not a valid index, or when the path descends through a scalar. A stored
/// `null` is returned as `Some(&Value::Null)`.
pub fn get_path<'a>(
    doc: &'a Value,
    path: &str,
) -> Option<&'a Value> {
    if path == ROOT_KEY {
        return Some(doc);
    }

    let mut current = doc;
    for segment in path.split(PATH_SEPARATOR) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Applies a write of `value` at `path` to `doc`.
///
/// - Root writes (`""`) deep-merge a mapping into the document.
/// - A `null` value written into a mapping deletes the key.
/// - Sequences are only written at existing indexes; they never grow.
/// - Missing intermediate mappings are created.
///
/// Errors are detected before anything is modified, so a failed call leaves
/// `doc` untouched.
pub fn apply_patch(
    doc: &mut Value,
    path: &str,
    value: Value,
) -> Result<(), DocumentError> {
    if path == ROOT_KEY {
        let incoming = match value {
            Value::Object(map) => map,
            other => return Err(DocumentError::RootNotMapping(kind_of(&other))),
        };
        if doc.is_null() {
            *doc = Value::Object(Map::new());
        }
        return match doc {
            Value::Object(origin) => {
                merge_maps(origin, incoming);
                Ok(())
            }
            _ => Err(DocumentError::StructuralConflict {
                path: path.to_string(),
                segment: ROOT_KEY.to_string(),
            }),
        };
    }

    let (parents, last) = match path.rsplit_once(PATH_SEPARATOR) {
        Some((parents, last)) => (Some(parents), last),
        None => (None, path),
    };

    let mut current = doc;
    if let Some(parents) = parents {
        for segment in parents.split(PATH_SEPARATOR) {
            current = descend_or_create(current, path, segment)?;
        }
    }

    match current {
        Value::Object(map) => {
            if value.is_null() {
                map.remove(last);
            } else {
                map.insert(last.to_string(), value);
            }
            Ok(())
        }
        Value::Array(items) => {
            let index = parse_index(path, last)?;
            let len = items.len();
            match items.get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(DocumentError::IndexOutOfRange {
                    path: path.to_string(),
                    index,
                    len,
                }),
            }
        }
        _ => Err(DocumentError::StructuralConflict {
            path: path.to_string(),
            segment: last.to_string(),
        }),
    }
}

/// Deep-merges `extra` into `origin`.
///
/// When both sides hold a mapping under the same key the merge recurses;
/// in every other case the incoming value replaces the existing one.
/// Sequences are replaced wholesale, never concatenated.
pub fn merge_maps(
    origin: &mut Map<String, Value>,
    extra: Map<String, Value>,
) {
    for (key, incoming) in extra {
        match incoming {
            Value::Object(sub) => match origin.get_mut(&key) {
                Some(Value::Object(existing)) => merge_maps(existing, sub),
                _ => {
                    origin.insert(key, Value::Object(sub));
                }
            },
            other => {
                origin.insert(key, other);
            }
        }
    }
}

// Creation only ever happens below a missing node, and nothing below a
// freshly created mapping can fail, so an error is always raised before the
// first mutation.
fn descend_or_create<'a>(
    current: &'a mut Value,
    path: &str,
    segment: &str,
) -> Result<&'a mut Value, DocumentError> {
    match current {
        Value::Object(map) => {
            let slot = map.entry(segment.to_string()).or_insert(Value::Null);
            if slot.is_null() {
                *slot = Value::Object(Map::new());
            }
            Ok(slot)
        }
        Value::Array(items) => {
            let index = parse_index(path, segment)?;
            let len = items.len();
            items.get_mut(index).ok_or(DocumentError::IndexOutOfRange {
                path: path.to_string(),
                index,
                len,
            })
        }
        _ => Err(DocumentError::StructuralConflict {
            path: path.to_string(),
            segment: segment.to_string(),
        }),
    }
}

fn parse_index(
    path: &str,
    segment: &str,
) -> Result<usize, DocumentError> {
    segment.parse::<usize>().map_err(|_| DocumentError::InvalidIndex {
        path: path.to_string(),
        segment: segment.to_string(),
    })
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
