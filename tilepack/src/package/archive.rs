//! Tile package archive extraction.
//!
//! A tile package is a ZIP container. Extraction goes through the
//! [`ArchiveExtractor`] trait so the reader can be tested against prepared
//! directory trees and alternative container formats can be plugged in.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use tracing::debug;

use crate::error::{PackageError, PackageResult};

/// Unpacks every entry of a container into a destination directory.
pub trait ArchiveExtractor: Send + Sync {
    /// Extract all entries of `archive_path` below `dest_dir`, overwriting
    /// existing files.
    ///
    /// # Returns
    ///
    /// The number of archive entries extracted.
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> PackageResult<usize>;
}

/// ZIP extractor backed by the `zip` crate.
///
/// Entry names that would escape the destination (absolute paths, `..`
/// components) are rejected by the underlying library.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExtractor;

impl ZipExtractor {
    /// Create a new ZIP extractor.
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> PackageResult<usize> {
        let file = File::open(archive_path)
            .map_err(|e| PackageError::container(archive_path, e.to_string()))?;

        let mut archive = zip::ZipArchive::new(BufReader::new(file))
            .map_err(|e| PackageError::container(archive_path, format!("not a ZIP archive: {}", e)))?;

        fs::create_dir_all(dest_dir).map_err(|e| {
            PackageError::container(
                archive_path,
                format!("cannot create staging directory {}: {}", dest_dir.display(), e),
            )
        })?;

        let entries = archive.len();
        debug!(
            archive = %archive_path.display(),
            entries,
            "Extracting tile package"
        );

        archive
            .extract(dest_dir)
            .map_err(|e| PackageError::container(archive_path, format!("extraction failed: {}", e)))?;

        Ok(entries)
    }
}
