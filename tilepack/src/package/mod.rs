//! Tile package loading and data model.
//!
//! # Components
//!
//! - [`PackageReader`]: stages a package archive and reads its documents
//! - [`StagedPackage`]: the loaded [`TilePackage`] plus its scoped staging directory
//! - [`ArchiveExtractor`]: container extraction seam, [`ZipExtractor`] by default
//! - [`documents`]: parsers for `conf.xml`, `iteminfo.xml` and `mapserver.json`
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use tilepack::package::PackageReader;
//!
//! let staged = PackageReader::new().open(Path::new("basemap.tpk"))?;
//! for lod in &staged.package().lods {
//!     println!("L{:02} -> zoom {}", lod.level, lod.zoom);
//! }
//! ```

mod archive;
pub mod documents;
mod reader;
mod types;

pub use archive::{ArchiveExtractor, ZipExtractor};
pub use reader::{read_package, PackageReader, StagedPackage};
pub use types::{
    tile_extension, LegendElement, LegendLayer, LevelOfDetail, StorageFormat, TilePackage,
    MIXED_FORMAT,
};

#[cfg(test)]
pub(crate) use types::test_support;
