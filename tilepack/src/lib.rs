//! tilepack - export compact-cache tile packages to a plain tile tree.
//!
//! A tile package (`.tpk`) is a ZIP container holding a pre-rendered map cache
//! in bundle files plus descriptive metadata. This library stages the
//! container, maps each level of detail onto the standard Web Mercator zoom
//! pyramid and writes every populated tile to `{zoom}/{column}/{row}.{ext}`.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use tilepack::config::ExportConfig;
//! use tilepack::package::PackageReader;
//!
//! let staged = PackageReader::new().open(Path::new("basemap.tpk"))?;
//! let summary = staged
//!     .exporter(ExportConfig::new().with_output_dir("tiles"))
//!     .export_zoom_levels(None)?;
//! println!("{}", summary);
//! ```

pub mod bundle;
pub mod config;
pub mod coord;
pub mod error;
pub mod export;
pub mod logging;
pub mod package;

pub use error::{AddressParseError, PackageError, PackageResult, TileIoError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
