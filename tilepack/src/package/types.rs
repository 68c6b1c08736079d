//! Tile package data model.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::coord::resolve_zoom;

/// Codec marker for caches that mix per-tile image formats.
pub const MIXED_FORMAT: &str = "MIXED";

/// How the cache stores its tiles on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StorageFormat {
    /// Compact cache with `.bundle` data and `.bundlx` index files.
    Compact,
    /// Compact cache with the index embedded in the `.bundle` header.
    CompactV2,
    /// Any other declared storage mode (e.g. exploded one-file-per-tile).
    Other(String),
}

impl StorageFormat {
    /// Parse the `StorageFormat` value of a map-configuration document.
    pub fn from_declared(value: &str) -> Self {
        match value.trim() {
            "esriMapCacheStorageModeCompact" => StorageFormat::Compact,
            "esriMapCacheStorageModeCompactV2" => StorageFormat::CompactV2,
            other => StorageFormat::Other(other.to_string()),
        }
    }
}

/// One rung of the cache's resolution ladder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelOfDetail {
    /// Ordinal LOD id as declared by the cache (folder `L{level}`).
    pub level: u32,
    /// Ground units per pixel.
    pub resolution: f64,
    /// Standard zoom level derived from `resolution`.
    pub zoom: u8,
}

impl LevelOfDetail {
    /// Create a level, deriving its zoom from the resolution and tile size.
    pub fn new(level: u32, resolution: f64, tile_size: u32) -> Self {
        Self {
            level,
            resolution,
            zoom: resolve_zoom(resolution, tile_size),
        }
    }
}

/// One entry of a legend layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendElement {
    /// Swatch image as a `data:` URI.
    pub image_data: String,
    /// Display label, omitted when the service declares neither a label nor values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Legend for one map layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendLayer {
    pub name: String,
    pub elements: Vec<LegendElement>,
}

/// Everything known about a tile package once it has been read.
///
/// Built once per run by [`PackageReader`](super::PackageReader) and read-only
/// afterwards. The zoom subset chosen for an export is a separate value and
/// never written back here.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePackage {
    /// Tile codec name as declared (e.g. `PNG8`, `JPEG`, `MIXED`).
    pub format: String,
    /// Tile edge length in pixels.
    pub tile_size: u32,
    /// Declared storage mode.
    pub storage: StorageFormat,
    /// Resolution ladder in document order.
    pub lods: Vec<LevelOfDetail>,
    pub name: String,
    pub summary: String,
    pub tags: String,
    pub description: String,
    pub credits: String,
    pub use_constraints: String,
    /// Geographic extent `[west, south, east, north]`.
    pub bounds: [f64; 4],
    pub legend: Vec<LegendLayer>,
}

impl TilePackage {
    /// Whether the package mixes codecs per tile.
    pub fn is_mixed(&self) -> bool {
        self.format.trim().eq_ignore_ascii_case(MIXED_FORMAT)
    }

    /// Zoom level of each LOD, index-aligned with [`lods`](Self::lods).
    pub fn zoom_levels(&self) -> Vec<u8> {
        self.lods.iter().map(|lod| lod.zoom).collect()
    }

    /// All zoom levels the package can produce, ascending and deduplicated.
    pub fn available_zooms(&self) -> BTreeSet<u8> {
        self.lods.iter().map(|lod| lod.zoom).collect()
    }

    /// Zoom level for a LOD ordinal, if the ladder declares it.
    pub fn zoom_for_lod(&self, level: u32) -> Option<u8> {
        self.lods
            .iter()
            .find(|lod| lod.level == level)
            .map(|lod| lod.zoom)
    }

    /// LODs that resolve to a zoom already produced by an earlier LOD.
    ///
    /// The first LOD in ladder order owns its zoom level; later LODs snapping
    /// to the same zoom are not exported.
    pub fn shadowed_lods(&self) -> Vec<&LevelOfDetail> {
        let mut claimed = BTreeSet::new();
        self.lods
            .iter()
            .filter(|lod| !claimed.insert(lod.zoom))
            .collect()
    }

    /// File extension for written tiles: the codec with digits stripped, lowercased.
    pub fn tile_extension(&self) -> String {
        tile_extension(&self.format)
    }
}

/// Derive a file extension from a codec name (`PNG8` → `png`).
pub fn tile_extension(format: &str) -> String {
    format
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .collect::<String>()
        .to_lowercase()
}
