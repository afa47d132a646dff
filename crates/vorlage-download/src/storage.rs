//! Read-only access to stored template files.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("template file not found: {0}")]
    NotFound(String),
    #[error("invalid storage path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("failed to read template file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Source of original template bytes, addressed by the path recorded on the template.
pub trait TemplateStorage {
    fn read(&self, relative_path: &str) -> Result<Vec<u8>, StorageError>;
}

impl<T: TemplateStorage + ?Sized> TemplateStorage for &T {
    fn read(&self, relative_path: &str) -> Result<Vec<u8>, StorageError> {
        (**self).read(relative_path)
    }
}

/// Templates stored as plain files beneath a root directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `relative_path` onto the root, refusing anything that could escape it.
    fn resolve(&self, relative_path: &str) -> Result<PathBuf, StorageError> {
        let invalid = |reason| StorageError::InvalidPath {
            path: relative_path.to_string(),
            reason,
        };

        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        for component in Path::new(relative_path).components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(invalid("parent directory components are not allowed"))
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("absolute paths are not allowed"))
                }
            }
        }
        if depth == 0 {
            return Err(invalid("path is empty"));
        }
        Ok(resolved)
    }
}

impl TemplateStorage for FsStorage {
    fn read(&self, relative_path: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(relative_path)?;
        match std::fs::read(&path) {
            Ok(bytes) => {
                log::debug!("read {} bytes from {}", bytes.len(), path.display());
                Ok(bytes)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(relative_path.to_string()))
            }
            Err(source) => Err(StorageError::Io {
                path: relative_path.to_string(),
                source,
            }),
        }
    }
}
