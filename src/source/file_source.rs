use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;
use tracing::trace;

use super::Source;
use crate::ContentType;
use crate::Result;
use crate::SourceError;

/// Cached file content with the modification time it was read at
#[derive(Debug, Clone)]
struct FileItem {
    content: Arc<Vec<u8>>,
    modified: SystemTime,
}

/// Local file source
///
/// Keys are file paths. Content is re-read from disk only when the file's
/// modification time changes. Files cannot be watched (refresh relies on the
/// cache TTL) and cannot be written.
#[derive(Debug, Default)]
pub struct FileSource {
    items: DashMap<PathBuf, FileItem>,
}

impl FileSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
        path: &Path,
    ) -> std::result::Result<Arc<Vec<u8>>, SourceError> {
        let path_error = |source| SourceError::PathError {
            path: path.to_path_buf(),
            source,
        };

        let modified = std::fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .map_err(path_error)?;

        if let Some(item) = self.items.get(path) {
            if item.modified == modified {
                trace!(?path, "conf file unchanged, serving cached content");
                return Ok(item.content.clone());
            }
        }

        debug!(?path, "reload conf file");
        let content = Arc::new(std::fs::read(path).map_err(path_error)?);
        self.items.insert(
            path.to_path_buf(),
            FileItem {
                content: content.clone(),
                modified,
            },
        );

        Ok(content)
    }
}

impl Source for FileSource {
    fn content_type(
        &self,
        key: &str,
    ) -> ContentType {
        ContentType::from_path(key)
    }

    fn get(
        &self,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        let content = self.read(Path::new(key))?;
        if content.is_empty() {
            return Ok(None);
        }
        Ok(Some(Vec::clone(&content)))
    }

    fn set(
        &self,
        _key: &str,
        _content: &[u8],
    ) -> Result<()> {
        Err(SourceError::Unsupported {
            operation: "set",
            source_kind: "file",
        }
        .into())
    }

    fn watch(
        &self,
        _key: &str,
    ) -> Option<broadcast::Receiver<()>> {
        None
    }
}
