//! Error types for archive conversion

use std::path::PathBuf;
use thiserror::Error;

/// Error type for conversion operations
#[derive(Error, Debug)]
pub enum ConvertError {
    /// I/O error when reading the archive or writing notebooks
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Notebook serialization or parsing error
    #[error("Notebook error: {0}")]
    Notebook(#[from] nbformat::NotebookError),

    /// Input is not a readable ZIP container
    #[error("{} is not a valid ZIP/DBC file: {source}", path.display())]
    InvalidArchive {
        /// Path of the rejected archive
        path: PathBuf,
        /// Underlying ZIP error
        source: zip::result::ZipError,
    },

    /// Entry within the archive exceeds the configured size limit
    #[error("Entry '{name}' is too large ({size} bytes, max {max} bytes)")]
    EntryTooLarge {
        /// Name of the entry
        name: String,
        /// Declared uncompressed size in bytes
        size: u64,
        /// Maximum allowed size in bytes
        max: u64,
    },

    /// A written notebook could not be read back
    #[error("Invalid notebook: {0}")]
    InvalidNotebook(String),
}

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;
