//! Bundle-to-tile-tree export.
//!
//! # Flow
//!
//! ```text
//! export_zoom_levels(requested)
//!   ├─ reject MIXED codec            (nothing touched on disk yet)
//!   ├─ normalize zoom set            (BTreeSet, package untouched)
//!   ├─ already cancelled? → return   (output root left alone)
//!   ├─ recreate output root
//!   ├─ discover + locate bundles     (malformed names → skipped_bundles)
//!   ├─ rayon pool, one task per bundle address:
//!   │    for i in 0..128*128 (column-major)
//!   │      in pyramid? → get_tile → empty? skip : write
//!   └─ metadata.json                 (exported zooms only)
//! ```
//!
//! Bundle and tile failures are recorded in the [`ExportSummary`] and never
//! abort the run. The call returns once every bundle has finished.
//!
//! Bundles sharing a zoom and grid offset (several `_alllayers` trees) write
//! the same tile paths. They run on one worker in path order, so the last
//! path wins on every run.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::metadata::TileSetMetadata;
use super::progress::{ExportProgress, NoProgress};
use super::summary::{BundleReport, ExportSummary, FailedTile};
use super::writer::TileStoreWriter;
use crate::bundle::{discover_bundles, locate_bundles, BundleDecoder, BundleFile, BUNDLE_GRID_SIZE};
use crate::config::ExportConfig;
use crate::coord::TileAddress;
use crate::error::{PackageError, PackageResult};
use crate::package::TilePackage;

/// Exports the tiles of a staged package to a zoom/column/row tree.
pub struct TileExporter<'a, D: BundleDecoder> {
    package: &'a TilePackage,
    staging_root: &'a Path,
    decoder: D,
    config: ExportConfig,
    cancellation: CancellationToken,
    progress: Arc<dyn ExportProgress>,
}

impl<'a, D: BundleDecoder> TileExporter<'a, D> {
    /// Create an exporter over `package`, whose contents are extracted at
    /// `staging_root`.
    pub fn new(
        package: &'a TilePackage,
        staging_root: &'a Path,
        decoder: D,
        config: ExportConfig,
    ) -> Self {
        Self {
            package,
            staging_root,
            decoder,
            config,
            cancellation: CancellationToken::new(),
            progress: Arc::new(NoProgress),
        }
    }

    /// Stop early when `token` is cancelled.
    ///
    /// The token is checked before each bundle and before each tile fetch.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Report per-bundle progress to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn ExportProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export the requested zoom levels, or every zoom the package declares
    /// when `requested` is `None`.
    ///
    /// The output root is destroyed and recreated first, unless the
    /// cancellation token has already fired, in which case nothing on disk is
    /// touched and a `cancelled` summary is returned.
    ///
    /// # Errors
    ///
    /// - [`PackageError::UnsupportedFormat`] for a mixed-codec package, before
    ///   the output root is touched
    /// - [`PackageError::OutputRoot`] if the output root cannot be recreated
    /// - [`PackageError::WorkerPool`] if the worker pool cannot be started
    pub fn export_zoom_levels(&self, requested: Option<&[u8]>) -> PackageResult<ExportSummary> {
        if self.package.is_mixed() {
            return Err(PackageError::UnsupportedFormat(self.package.format.clone()));
        }

        let available = self.package.available_zooms();
        let zooms: BTreeSet<u8> = match requested {
            Some(levels) => levels.iter().copied().collect(),
            None => available.clone(),
        };

        let mut summary = ExportSummary::new();
        summary.zoom_levels = zooms.iter().copied().collect();
        for zoom in zooms.difference(&available) {
            warn!(zoom, "Requested zoom level not present in package");
            summary.add_warning(format!("zoom level {} is not present in the package", zoom));
        }
        for lod in self.package.shadowed_lods() {
            if zooms.contains(&lod.zoom) {
                warn!(
                    lod = lod.level,
                    zoom = lod.zoom,
                    "LOD shares its zoom with an earlier LOD, not exported"
                );
                summary.add_warning(format!(
                    "LOD {} resolves to zoom {} which an earlier LOD already provides; its bundles were not exported",
                    lod.level, lod.zoom
                ));
            }
        }

        if self.cancellation.is_cancelled() {
            warn!("Export cancelled before start, output root left untouched");
            summary.cancelled = true;
            return Ok(summary);
        }

        let writer = TileStoreWriter::create(
            &self.config.output_dir,
            self.package.tile_extension(),
            self.config.scheme,
        )?;

        let located = locate_bundles(discover_bundles(self.staging_root)?, self.package, &zooms);
        for rejected in located.rejected {
            summary.add_skipped_bundle(rejected.path, rejected.error.to_string());
        }
        summary.bundles_total = located.bundles.len();

        info!(
            zooms = ?summary.zoom_levels,
            bundles = located.bundles.len(),
            workers = self.config.workers,
            output = %writer.root().display(),
            "Starting export"
        );

        for report in self.export_bundles(&located.bundles, &writer)? {
            summary.record(report);
        }
        if self.cancellation.is_cancelled() {
            summary.cancelled = true;
        }

        if summary.cancelled {
            warn!("Export cancelled, partial output left in place");
        } else if self.config.write_metadata {
            let exported: Vec<u8> = zooms.intersection(&available).copied().collect();
            let metadata = TileSetMetadata::new(self.package, &exported, self.config.scheme);
            match metadata.write_to(writer.root()) {
                Ok(path) => summary.metadata_path = Some(path),
                Err(e) => {
                    warn!(error = %e, "Failed to write metadata.json");
                    summary.add_warning(format!("metadata.json not written: {}", e));
                }
            }
        }

        info!(
            tiles = summary.tiles_written,
            empty = summary.empty_slots,
            out_of_range = summary.out_of_range_slots,
            failed = summary.failed_tiles.len(),
            skipped = summary.skipped_bundles.len(),
            "Export finished"
        );

        Ok(summary)
    }

    /// Run every bundle through a bounded worker pool and wait for all of them.
    ///
    /// Bundles with the same zoom and offsets form one task and run in the
    /// order given.
    fn export_bundles(
        &self,
        bundles: &[BundleFile],
        writer: &TileStoreWriter,
    ) -> PackageResult<Vec<BundleReport>> {
        self.progress.on_start(bundles.len());
        if bundles.is_empty() {
            self.progress.on_finish();
            return Ok(Vec::new());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers.max(1))
            .thread_name(|i| format!("tilepack-export-{}", i))
            .build()
            .map_err(|e| PackageError::WorkerPool(e.to_string()))?;

        let mut by_address: BTreeMap<(u8, u32, u32), Vec<&BundleFile>> = BTreeMap::new();
        for bundle in bundles {
            by_address
                .entry((bundle.zoom, bundle.column_offset, bundle.row_offset))
                .or_default()
                .push(bundle);
        }
        let tasks: Vec<Vec<&BundleFile>> = by_address.into_values().collect();

        let completed = AtomicUsize::new(0);
        let total = bundles.len();
        let reports: Vec<Vec<BundleReport>> = pool.install(|| {
            tasks
                .par_iter()
                .map(|group| {
                    group
                        .iter()
                        .map(|bundle| {
                            let report = self.export_bundle(bundle, writer);
                            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                            self.progress.on_bundle_complete(&report, done, total);
                            report
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        });

        self.progress.on_finish();
        Ok(reports.into_iter().flatten().collect())
    }

    /// Export all populated, in-range slots of one bundle.
    fn export_bundle(&self, bundle: &BundleFile, writer: &TileStoreWriter) -> BundleReport {
        let mut report = BundleReport::new(&bundle.path, bundle.zoom);

        if self.cancellation.is_cancelled() {
            report.cancelled = true;
            return report;
        }

        let mut reader = match self.decoder.open(&bundle.path, BUNDLE_GRID_SIZE) {
            Ok(reader) => reader,
            Err(e) => {
                warn!(bundle = %bundle.path.display(), error = %e, "Skipping bundle");
                report.skipped = Some(e.to_string());
                return report;
            }
        };

        for slot in 0..BUNDLE_GRID_SIZE * BUNDLE_GRID_SIZE {
            if self.cancellation.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let local_col = slot / BUNDLE_GRID_SIZE;
            let local_row = slot % BUNDLE_GRID_SIZE;
            let address = TileAddress::new(
                bundle.zoom,
                bundle.column_offset + local_col,
                bundle.row_offset + local_row,
            );

            if !address.is_within_pyramid() {
                report.out_of_range_slots += 1;
                continue;
            }

            let result = reader
                .get_tile(address.column, address.row, address.zoom)
                .and_then(|bytes| {
                    if bytes.is_empty() {
                        Ok(None)
                    } else {
                        writer.write_tile(address, &bytes).map(Some)
                    }
                });

            match result {
                Ok(Some(_)) => report.tiles_written += 1,
                Ok(None) => report.empty_slots += 1,
                Err(e) => {
                    warn!(tile = %address, bundle = %bundle.path.display(), error = %e, "Tile failed");
                    report.failed_tiles.push(FailedTile {
                        address,
                        bundle: bundle.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            bundle = %bundle.path.display(),
            zoom = bundle.zoom,
            tiles = report.tiles_written,
            empty = report.empty_slots,
            out_of_range = report.out_of_range_slots,
            failed = report.failed_tiles.len(),
            "Bundle exported"
        );

        report
    }
}
