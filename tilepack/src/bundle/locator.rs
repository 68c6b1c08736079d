//! Bundle discovery.
//!
//! Finds the `.bundle` files of an extracted package and keeps the ones whose
//! LOD maps to a requested zoom level.
//!
//! # Layout
//!
//! ```text
//! <staging>/v101/Layers/_alllayers/L00/R0000C0000.bundle
//!                                  L01/R0000C0000.bundle
//!                                  ...
//! ```
//!
//! Packages may hold more than one `_alllayers` directory; all are scanned.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::address::{parse_bundle_address, BundleAddress};
use crate::error::{AddressParseError, PackageError, PackageResult};
use crate::package::TilePackage;

/// Directory name that holds the LOD folders of a compact cache.
pub const CACHE_LAYER_DIR: &str = "_alllayers";

/// A bundle scheduled for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFile {
    pub path: PathBuf,
    /// LOD ordinal from the `L{nn}` folder.
    pub lod: u32,
    /// Global row of the top-left tile.
    pub row_offset: u32,
    /// Global column of the top-left tile.
    pub column_offset: u32,
    /// Zoom level the LOD resolves to.
    pub zoom: u8,
}

impl BundleFile {
    fn new(path: PathBuf, address: BundleAddress, zoom: u8) -> Self {
        Self {
            path,
            lod: address.lod,
            row_offset: address.row_offset,
            column_offset: address.column_offset,
            zoom,
        }
    }
}

/// A bundle whose path does not follow the addressing grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedBundle {
    pub path: PathBuf,
    pub error: AddressParseError,
}

/// Result of filtering discovered bundles.
#[derive(Debug, Default)]
pub struct LocatedBundles {
    /// Bundles in the requested zoom set, in path order.
    pub bundles: Vec<BundleFile>,
    /// Bundles excluded because their address could not be decoded.
    pub rejected: Vec<RejectedBundle>,
}

/// List every `*.bundle` inside any `_alllayers` directory below `staging_root`.
///
/// The extension is matched case-insensitively. Returns the paths sorted. An
/// empty list is not an error.
///
/// # Errors
///
/// Returns [`PackageError::ContainerRead`] if the staging root cannot be
/// scanned.
pub fn discover_bundles(staging_root: &Path) -> PackageResult<Vec<PathBuf>> {
    let root = glob::Pattern::escape(&staging_root.to_string_lossy());
    let layer_pattern = format!("{}/**/{}", root, CACHE_LAYER_DIR);

    let layer_dirs = glob::glob(&layer_pattern)
        .map_err(|e| PackageError::container(staging_root, format!("bad scan pattern: {}", e)))?
        .filter_map(|entry| match entry {
            Ok(path) if path.is_dir() => Some(path),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Unreadable entry while scanning for cache layers");
                None
            }
        });

    let bundle_match = glob::MatchOptions {
        case_sensitive: false,
        ..glob::MatchOptions::new()
    };

    let mut bundles = Vec::new();
    for layer_dir in layer_dirs {
        let pattern = format!(
            "{}/*/*.bundle",
            glob::Pattern::escape(&layer_dir.to_string_lossy())
        );
        let entries = glob::glob_with(&pattern, bundle_match).map_err(|e| {
            PackageError::container(staging_root, format!("bad scan pattern: {}", e))
        })?;
        bundles.extend(entries.filter_map(Result::ok).filter(|p| p.is_file()));
    }

    bundles.sort();
    bundles.dedup();

    debug!(
        root = %staging_root.display(),
        bundles = bundles.len(),
        "Bundle scan complete"
    );

    Ok(bundles)
}

/// Decode bundle addresses and keep the bundles in the requested zoom set.
///
/// Bundles whose name or LOD folder is malformed are returned in
/// [`LocatedBundles::rejected`]. Bundles whose LOD is not declared by the
/// package, whose zoom is not requested, or whose LOD is shadowed by an
/// earlier LOD of the same zoom ([`TilePackage::shadowed_lods`]) are dropped
/// silently.
pub fn locate_bundles(
    paths: Vec<PathBuf>,
    package: &TilePackage,
    zooms: &BTreeSet<u8>,
) -> LocatedBundles {
    let mut located = LocatedBundles::default();
    let shadowed: BTreeSet<u32> = package.shadowed_lods().iter().map(|lod| lod.level).collect();

    for path in paths {
        let filename = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let folder = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let address = match parse_bundle_address(&filename, &folder) {
            Ok(address) => address,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "Skipping bundle");
                located.rejected.push(RejectedBundle { path, error });
                continue;
            }
        };

        let Some(zoom) = package.zoom_for_lod(address.lod) else {
            debug!(path = %path.display(), lod = address.lod, "LOD not in ladder, ignoring bundle");
            continue;
        };

        if shadowed.contains(&address.lod) {
            debug!(path = %path.display(), lod = address.lod, zoom, "LOD shadowed, ignoring bundle");
            continue;
        }

        if zooms.contains(&zoom) {
            located.bundles.push(BundleFile::new(path, address, zoom));
        }
    }

    located
}
