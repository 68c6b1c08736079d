//! `metadata.json` sidecar written next to the tile tree.
//!
//! Carries the descriptive metadata of the package so the exported tree can
//! be published without the original container. The content depends only on
//! the package and the export settings; no timestamps are recorded, so
//! re-exporting the same package produces an identical file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::TileScheme;
use crate::package::{LegendLayer, TilePackage};

/// File name of the sidecar inside the output root.
pub const METADATA_FILE: &str = "metadata.json";

/// Serialized form of the sidecar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileSetMetadata {
    pub name: String,
    pub summary: String,
    pub description: String,
    pub tags: String,
    pub credits: String,
    pub use_constraints: String,
    pub format: String,
    pub extension: String,
    pub tile_size: u32,
    /// `[west, south, east, north]`
    pub bounds: [f64; 4],
    pub scheme: TileScheme,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u8>,
    pub zoom_levels: Vec<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub legend: Vec<LegendLayer>,
}

impl TileSetMetadata {
    /// Describe an export of `zoom_levels` (ascending) from `package`.
    pub fn new(package: &TilePackage, zoom_levels: &[u8], scheme: TileScheme) -> Self {
        Self {
            name: package.name.clone(),
            summary: package.summary.clone(),
            description: package.description.clone(),
            tags: package.tags.clone(),
            credits: package.credits.clone(),
            use_constraints: package.use_constraints.clone(),
            format: package.format.clone(),
            extension: package.tile_extension(),
            tile_size: package.tile_size,
            bounds: package.bounds,
            scheme,
            min_zoom: zoom_levels.iter().copied().min(),
            max_zoom: zoom_levels.iter().copied().max(),
            zoom_levels: zoom_levels.to_vec(),
            legend: package.legend.clone(),
        }
    }

    /// Write the sidecar into `output_root`, returning its path.
    pub fn write_to(&self, output_root: &Path) -> io::Result<PathBuf> {
        let path = output_root.join(METADATA_FILE);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(path)
    }
}
