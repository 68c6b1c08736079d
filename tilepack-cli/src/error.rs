//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use tilepack::config::ConfigFileError;
use tilepack::PackageError;

/// Every tile was exported.
pub const EXIT_SUCCESS: i32 = 0;
/// The run aborted before or during setup.
pub const EXIT_FATAL: i32 = 1;
/// The run finished but skipped bundles, failed tiles, wrote nothing or was cancelled.
pub const EXIT_PARTIAL: i32 = 2;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// `--config` points at a missing file
    ConfigNotFound(PathBuf),
    /// Configuration file could not be parsed
    Config(ConfigFileError),
    /// Package loading or export failed
    Package(PackageError),
    /// Ctrl+C handler could not be installed
    SignalHandler(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Package(PackageError::UnsupportedFormat(_)) => {
                eprintln!();
                eprintln!("This package stores tiles in more than one image format.");
                eprintln!("Re-create the cache with a single tile format (PNG or JPEG) and export again.");
            }
            CliError::Package(PackageError::ContainerRead { .. }) => {
                eprintln!();
                eprintln!("Make sure the file is a tile package (.tpk) and not truncated.");
                eprintln!("Run 'tilepack inspect <PACKAGE>' to check its contents.");
            }
            CliError::Config(_) | CliError::ConfigNotFound(_) => {
                eprintln!();
                eprintln!(
                    "Default config location: {}",
                    tilepack::config::config_file_path().display()
                );
            }
            _ => {}
        }

        process::exit(EXIT_FATAL)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::ConfigNotFound(path) => {
                write!(f, "Config file not found: {}", path.display())
            }
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Package(e) => write!(f, "{}", e),
            CliError::SignalHandler(msg) => {
                write!(f, "Failed to set signal handler: {}", msg)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Package(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<PackageError> for CliError {
    fn from(e: PackageError) -> Self {
        CliError::Package(e)
    }
}
