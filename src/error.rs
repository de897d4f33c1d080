//! The single error type reported by project file operations.
//!
//! Every read, write and import returns `Result<_, YwError>`. The `Display`
//! text is a plain English fallback; user-facing (possibly translated) text
//! comes from [`MessageCatalog::describe`](crate::messages::MessageCatalog::describe).
//!
//! Only *fatal* conditions become errors. Optional data that cannot be parsed
//! degrades to its documented default inside the reader instead.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum YwError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("Project is locked by yWriter: {0}")]
    Locked(PathBuf),
    #[error("Cannot process file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Cannot overwrite file {path}: {source}")]
    WriteProtected {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot write file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),
}

impl YwError {
    pub(crate) fn parse(path: &Path, message: impl Into<String>) -> Self {
        YwError::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// The file the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            YwError::NotFound(path)
            | YwError::Locked(path)
            | YwError::UnsupportedFormat(path)
            | YwError::Parse { path, .. }
            | YwError::WriteProtected { path, .. }
            | YwError::Io { path, .. } => path,
        }
    }
}
