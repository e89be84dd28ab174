//! Error types for the linker module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur creating or removing library links.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Failed to create a symbolic link.
    #[error("Failed to create link at {path}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove a symbolic link.
    #[error("Failed to remove link at {path}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Refusing to remove something that is not a symbolic link.
    #[error("Not a symbolic link, refusing to remove: {path}")]
    NotASymlink { path: PathBuf },

    /// Failed to create parent directories.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
