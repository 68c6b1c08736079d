//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use tracing::info;

use tilepack::config::{ConfigFile, TileScheme};
use tilepack::logging::{init_logging, LoggingGuard};
use tilepack::package::PackageReader;

use crate::error::CliError;

/// Options accepted by every command.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Configuration file [default: ~/.tilepack/config.ini]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write the log to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

/// Tile scheme selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SchemeArg {
    /// Row 0 at the north edge (web maps)
    Xyz,
    /// Row 0 at the south edge
    Tms,
}

impl From<SchemeArg> for TileScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Xyz => TileScheme::Xyz,
            SchemeArg::Tms => TileScheme::Tms,
        }
    }
}

/// Load the configuration file named on the command line, or the default one.
///
/// An explicit path must exist; the default path may be absent.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) if !path.exists() => Err(CliError::ConfigNotFound(path.to_path_buf())),
        Some(path) => Ok(ConfigFile::load_from(path)?),
        None => Ok(ConfigFile::load()?),
    }
}

/// Per-command setup: configuration plus active logging.
pub struct Session {
    /// Logging guard - keeps logging active while the session exists
    _logging: LoggingGuard,
    config: ConfigFile,
}

impl Session {
    /// Load configuration and initialize logging for `command`.
    pub fn start(common: &CommonArgs, command: &str) -> Result<Self, CliError> {
        let config = load_config(common.config.as_deref())?;

        let log_file = common
            .log_file
            .clone()
            .or_else(|| config.logging.file.clone());
        let logging = init_logging(log_file.as_deref(), common.verbose)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        info!(version = tilepack::VERSION, command, "tilepack starting");

        Ok(Self {
            _logging: logging,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Package reader honoring a staging directory override.
    pub fn package_reader(&self, staging_dir: Option<&Path>) -> PackageReader {
        let staging = staging_dir
            .map(Path::to_path_buf)
            .or_else(|| self.config.export.staging_dir.clone());
        match staging {
            Some(dir) => PackageReader::new().with_staging_parent(dir),
            None => PackageReader::new(),
        }
    }
}
