//! Export configuration.
//!
//! [`ExportConfig`] carries the settings of one export run. It can be built
//! directly or derived from a [`ConfigFile`] loaded from
//! `~/.tilepack/config.ini`, with command-line values layered on top.

mod file;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, ExportSettings,
    LoggingSettings,
};

/// Default output root, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "tiles";

/// Row numbering of the written tile tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TileScheme {
    /// Row 0 at the north edge (slippy map / XYZ).
    #[default]
    Xyz,
    /// Row 0 at the south edge (TMS).
    Tms,
}

impl FromStr for TileScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "xyz" => Ok(TileScheme::Xyz),
            "tms" => Ok(TileScheme::Tms),
            other => Err(format!("unknown tile scheme '{}', expected xyz or tms", other)),
        }
    }
}

impl fmt::Display for TileScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileScheme::Xyz => write!(f, "xyz"),
            TileScheme::Tms => write!(f, "tms"),
        }
    }
}

/// Settings for one export run.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportConfig {
    /// Output root. Its previous contents are destroyed.
    pub output_dir: PathBuf,

    /// Number of bundles processed concurrently.
    pub workers: usize,

    /// Row numbering of written tiles.
    pub scheme: TileScheme,

    /// Write `metadata.json` next to the tile tree.
    pub write_metadata: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            workers: default_workers(),
            scheme: TileScheme::default(),
            write_metadata: true,
        }
    }
}

impl ExportConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output root.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Set the worker count (at least 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the tile scheme.
    pub fn with_scheme(mut self, scheme: TileScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Enable or disable the metadata sidecar.
    pub fn with_metadata(mut self, write_metadata: bool) -> Self {
        self.write_metadata = write_metadata;
        self
    }
}

/// Available parallelism, or 1 if it cannot be determined.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
