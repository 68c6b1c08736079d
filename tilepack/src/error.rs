//! Error types for package loading and export.
//!
//! Errors fall into two groups:
//!
//! - [`PackageError`] is fatal and aborts the run before (or instead of) any
//!   tile work.
//! - [`AddressParseError`] and [`TileIoError`] are isolated to one bundle or
//!   one tile. The exporter records them in the
//!   [`ExportSummary`](crate::export::ExportSummary) and keeps going.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::coord::TileAddress;

/// Result type for package-level operations.
pub type PackageResult<T> = Result<T, PackageError>;

/// Fatal errors that abort a run.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The input path was empty or does not exist.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The archive could not be read or a required document is missing.
    #[error("cannot read tile package {}: {reason}", path.display())]
    ContainerRead { path: PathBuf, reason: String },

    /// A required document is unparsable or a required field is malformed.
    #[error("malformed {document}: {reason}")]
    PackageFormat { document: String, reason: String },

    /// The package declares a tile codec that cannot be exported.
    #[error("unsupported tile format '{0}': per-tile codec detection is not supported")]
    UnsupportedFormat(String),

    /// The output root could not be removed or created.
    #[error("cannot prepare output directory {}: {source}", path.display())]
    OutputRoot { path: PathBuf, source: io::Error },

    /// The bundle worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

impl PackageError {
    /// Shorthand for a [`PackageError::PackageFormat`] error.
    pub fn format(document: impl Into<String>, reason: impl Into<String>) -> Self {
        PackageError::PackageFormat {
            document: document.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`PackageError::ContainerRead`] error.
    pub fn container(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PackageError::ContainerRead {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A bundle file or its LOD folder does not follow the addressing grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    /// The file stem is not `R<4 hex>C<4 hex>`.
    #[error("bundle name '{0}' does not match R<hex4>C<hex4>")]
    InvalidFilename(String),

    /// The parent folder is not `L<digits>`.
    #[error("LOD folder '{0}' does not match L<digits>")]
    InvalidLodFolder(String),
}

/// Fetching or writing a single tile failed.
#[derive(Debug, Error)]
pub enum TileIoError {
    /// The bundle could not be opened or its index could not be read.
    #[error("cannot open bundle {}: {reason}", path.display())]
    BundleOpen { path: PathBuf, reason: String },

    /// The bundle decoder failed for one tile.
    #[error("failed to read tile {address}: {reason}")]
    Fetch { address: TileAddress, reason: String },

    /// The tile bytes could not be written to disk.
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}
