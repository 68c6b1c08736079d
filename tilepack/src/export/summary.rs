//! Export run summary.

use std::fmt;
use std::path::PathBuf;

use crate::coord::TileAddress;

/// A bundle that produced no tiles because it could not be addressed or opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBundle {
    pub path: PathBuf,
    pub reason: String,
}

/// A tile that could not be fetched or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTile {
    pub address: TileAddress,
    /// Bundle the tile was read from.
    pub bundle: PathBuf,
    pub reason: String,
}

/// Outcome of exporting a single bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleReport {
    pub path: PathBuf,
    pub zoom: u8,
    pub tiles_written: u64,
    /// In-range slots the bundle leaves unpopulated.
    pub empty_slots: u64,
    /// Slots whose global address lies outside the zoom level's grid.
    pub out_of_range_slots: u64,
    pub failed_tiles: Vec<FailedTile>,
    /// Set when the bundle could not be opened.
    pub skipped: Option<String>,
    /// Set when cancellation stopped the bundle early or before it started.
    pub cancelled: bool,
}

impl BundleReport {
    pub fn new(path: impl Into<PathBuf>, zoom: u8) -> Self {
        Self {
            path: path.into(),
            zoom,
            ..Self::default()
        }
    }

    /// Whether every slot of the bundle was visited.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_none() && !self.cancelled
    }
}

/// Aggregate result of an export run.
///
/// Bundle- and tile-level failures never abort a run; they are collected
/// here with enough identity to find the offending file or tile.
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    /// Zoom levels that were requested, ascending.
    pub zoom_levels: Vec<u8>,

    /// Bundles selected for export.
    pub bundles_total: usize,

    /// Bundles whose slots were all visited.
    pub bundles_exported: usize,

    pub tiles_written: u64,
    pub empty_slots: u64,
    pub out_of_range_slots: u64,

    pub skipped_bundles: Vec<SkippedBundle>,
    pub failed_tiles: Vec<FailedTile>,

    /// Non-fatal issues that are not tied to a bundle or tile.
    pub warnings: Vec<String>,

    /// The run was interrupted before every bundle was processed.
    pub cancelled: bool,

    /// Location of the written `metadata.json`, if any.
    pub metadata_path: Option<PathBuf>,
}

impl ExportSummary {
    /// Create a new empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any warnings were generated.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Add a warning to the summary.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record a bundle excluded before export.
    pub fn add_skipped_bundle(&mut self, path: impl Into<PathBuf>, reason: impl Into<String>) {
        self.skipped_bundles.push(SkippedBundle {
            path: path.into(),
            reason: reason.into(),
        });
    }

    /// Fold one bundle's outcome into the totals.
    pub fn record(&mut self, report: BundleReport) {
        self.tiles_written += report.tiles_written;
        self.empty_slots += report.empty_slots;
        self.out_of_range_slots += report.out_of_range_slots;
        self.failed_tiles.extend(report.failed_tiles);

        if report.cancelled {
            self.cancelled = true;
        }
        match report.skipped {
            Some(reason) => self.skipped_bundles.push(SkippedBundle {
                path: report.path,
                reason,
            }),
            None if !report.cancelled => self.bundles_exported += 1,
            None => {}
        }
    }

    /// A run that wrote tiles and hit no problem of any kind.
    pub fn is_clean(&self) -> bool {
        self.tiles_written > 0
            && self.skipped_bundles.is_empty()
            && self.failed_tiles.is_empty()
            && self.warnings.is_empty()
            && !self.cancelled
    }
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tiles written from {}/{} bundles ({} empty, {} out of range, {} failed, {} bundles skipped)",
            self.tiles_written,
            self.bundles_exported,
            self.bundles_total,
            self.empty_slots,
            self.out_of_range_slots,
            self.failed_tiles.len(),
            self.skipped_bundles.len()
        )?;
        if self.cancelled {
            write!(f, " [cancelled]")?;
        }
        Ok(())
    }
}
