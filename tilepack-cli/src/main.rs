//! tilepack CLI - Command-line interface
//!
//! Converts tile packages into a plain `{zoom}/{column}/{row}` tile tree.
//!
//! Exit codes: 0 when every tile was exported, 2 when the run finished with
//! skipped bundles, failed tiles, no tiles or cancellation, 1 on fatal errors.

mod commands;
mod error;

use std::process;

use clap::{Parser, Subcommand};

use commands::export::ExportArgs;
use commands::inspect::InspectArgs;
use error::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "tilepack")]
#[command(version, about = "Export tile packages to a zoom/column/row tile tree", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the tiles of a package
    Export(ExportArgs),
    /// Show package metadata without exporting
    Inspect(InspectArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Export(args) => commands::export::run(args),
        Commands::Inspect(args) => commands::inspect::run(args).map(|_| EXIT_SUCCESS),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => e.exit(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_export_flags() {
        let cli = Cli::try_parse_from([
            "tilepack", "export", "city.tpk", "--output", "out", "--zoom", "3,5", "-z", "7",
            "--scheme", "tms", "--no-metadata", "--workers", "4",
        ])
        .unwrap();

        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.zooms, vec![3, 5, 7]);
                assert_eq!(args.workers, Some(4));
                assert!(args.no_metadata);
                assert_eq!(args.output.as_deref(), Some(std::path::Path::new("out")));
            }
            Commands::Inspect(_) => panic!("expected export"),
        }
    }

    #[test]
    fn test_export_requires_package() {
        assert!(Cli::try_parse_from(["tilepack", "export"]).is_err());
    }
}
