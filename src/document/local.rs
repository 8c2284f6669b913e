use std::path::{Path, PathBuf};

use super::{Document, DocumentError, RawDocument};

/// The task document on local disk.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document, or `None` if nothing has been saved yet.
    pub fn read(&self) -> Result<Option<RawDocument>, DocumentError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(DocumentError::Read {
                    path: self.path.display().to_string(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        RawDocument::parse(&content).map(Some)
    }

    /// Write the whole document, replacing the previous file atomically.
    pub fn write(&self, document: &Document) -> Result<(), DocumentError> {
        let content = serde_json::to_string_pretty(document)?;
        let write_err = |source: std::io::Error| DocumentError::Write {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(write_err)?;
        std::fs::rename(&tmp_path, &self.path).map_err(write_err)?;
        log::debug!("Saved {} task(s) to {}", document.tasks.len(), self.path.display());
        Ok(())
    }
}
