//! Error types for archive storage and resolution

use std::path::PathBuf;
use thiserror::Error;

/// Storage operation result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by archive storage, manifest handling and map resolution
#[derive(Debug, Error)]
pub enum StorageError {
    /// A pk3 archive could not be opened or walked
    #[error("archive {}: {source}", .archive.display())]
    Archive {
        /// Archive the operation was against
        archive: PathBuf,
        /// Underlying zip error
        source: zip::result::ZipError,
    },

    /// A pk3 archive file could not be opened from disk
    #[error("open archive {}: {source}", .archive.display())]
    ArchiveOpen {
        /// Archive the operation was against
        archive: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Writing an entry to an output archive failed
    #[error("write entry {entry}: {source}")]
    EntryWrite {
        /// Virtual path of the entry
        entry: String,
        /// Underlying zip error
        source: zip::result::ZipError,
    },

    /// A single entry inside a pk3 could not be read
    #[error("entry {entry} in {}: {source}", .archive.display())]
    Entry {
        /// Archive the entry belongs to
        archive: PathBuf,
        /// Virtual path of the entry
        entry: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// A virtual path was requested that no indexed archive provides
    #[error("file not in index: {0}")]
    NotIndexed(String),

    /// The map's compiled geometry is missing; resolution cannot proceed
    #[error("map geometry not found: {0}")]
    MapNotFound(String),

    /// The requested game variant has no manifest entry
    #[error("game {0} not present in manifest")]
    UnknownGame(String),

    /// No game variant directory under the input root contains archives
    #[error("no game directories found in {}", .0.display())]
    NoGameData(PathBuf),

    /// Map geometry failed structural parsing
    #[error("parse map geometry: {0}")]
    Bsp(#[from] pakette_formats::bsp::BspError),

    /// Manifest (de)serialization failed
    #[error("manifest {}: {source}", .path.display())]
    Manifest {
        /// Manifest file path
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// Plain I/O error outside any archive
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
