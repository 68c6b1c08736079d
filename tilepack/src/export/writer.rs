//! Tile tree output.
//!
//! Tiles land at `{root}/{zoom}/{column}/{row}.{extension}`. The row is
//! flipped to count from the south edge when the TMS scheme is selected.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::TileScheme;
use crate::coord::TileAddress;
use crate::error::{PackageError, PackageResult, TileIoError};

/// Writes tile bytes below an output root.
#[derive(Debug, Clone)]
pub struct TileStoreWriter {
    root: PathBuf,
    extension: String,
    scheme: TileScheme,
}

impl TileStoreWriter {
    /// Recreate `root` as an empty directory and return a writer for it.
    ///
    /// A file at `root` is removed, as is any previous directory tree.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::OutputRoot`] if the old contents cannot be
    /// removed or the directory cannot be created.
    pub fn create(
        root: impl Into<PathBuf>,
        extension: impl Into<String>,
        scheme: TileScheme,
    ) -> PackageResult<Self> {
        let root = root.into();
        reset_output_root(&root).map_err(|source| PackageError::OutputRoot {
            path: root.clone(),
            source,
        })?;
        debug!(root = %root.display(), "Output root recreated");

        Ok(Self {
            root,
            extension: extension.into(),
            scheme,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path a tile is written to.
    pub fn tile_path(&self, address: TileAddress) -> PathBuf {
        let row = match self.scheme {
            TileScheme::Xyz => address.row,
            TileScheme::Tms => address.tms_row(),
        };
        self.root
            .join(address.zoom.to_string())
            .join(address.column.to_string())
            .join(format!("{}.{}", row, self.extension))
    }

    /// Write one tile, creating its zoom and column directories as needed.
    ///
    /// An existing file at the same path is overwritten.
    pub fn write_tile(&self, address: TileAddress, bytes: &[u8]) -> Result<PathBuf, TileIoError> {
        let path = self.tile_path(address);
        let write_error = |source| TileIoError::Write {
            path: path.clone(),
            source,
        };

        if let Some(column_dir) = path.parent() {
            // create_dir_all tolerates a concurrent creator
            fs::create_dir_all(column_dir).map_err(write_error)?;
        }
        fs::write(&path, bytes).map_err(write_error)?;

        Ok(path)
    }
}

fn reset_output_root(root: &Path) -> io::Result<()> {
    match fs::symlink_metadata(root) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(root)?,
        Ok(_) => fs::remove_file(root)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::create_dir_all(root)
}
