//! Tile export.
//!
//! [`TileExporter`] walks the bundles of a staged package and writes every
//! populated, in-range tile through a [`TileStoreWriter`]. The outcome of a
//! run is an [`ExportSummary`].

mod exporter;
mod metadata;
mod progress;
mod summary;
mod writer;

pub use exporter::TileExporter;
pub use metadata::{TileSetMetadata, METADATA_FILE};
pub use progress::{ExportProgress, NoProgress};
pub use summary::{BundleReport, ExportSummary, FailedTile, SkippedBundle};
pub use writer::TileStoreWriter;
