//! Export command: write a package's tiles to a zoom/column/row tree.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use tilepack::config::{ConfigFile, ExportConfig};
use tilepack::export::{BundleReport, ExportProgress, ExportSummary};
use tokio_util::sync::CancellationToken;

use super::common::{CommonArgs, SchemeArg, Session};
use crate::error::{CliError, EXIT_PARTIAL, EXIT_SUCCESS};

/// Failing tiles listed individually before the rest are summarized.
const MAX_LISTED_FAILURES: usize = 10;

/// Arguments for `tilepack export`.
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Tile package (.tpk) to export
    pub package: PathBuf,

    /// Output directory; existing contents are deleted [default: tiles]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Zoom level to export; repeat or comma-separate for several [default: all]
    #[arg(short, long = "zoom", value_name = "Z", value_delimiter = ',')]
    pub zooms: Vec<u8>,

    /// Bundles processed in parallel [default: available cores]
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Row numbering of the written tree [default: xyz]
    #[arg(long, value_enum)]
    pub scheme: Option<SchemeArg>,

    /// Do not write metadata.json
    #[arg(long)]
    pub no_metadata: bool,

    /// Parent directory for the temporary extraction
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Settings from the config file with command-line flags layered on top.
pub fn build_config(args: &ExportArgs, file: &ConfigFile) -> ExportConfig {
    let mut config = file.export_config();
    if let Some(output) = &args.output {
        config = config.with_output_dir(output.clone());
    }
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if let Some(scheme) = args.scheme {
        config = config.with_scheme(scheme.into());
    }
    if args.no_metadata {
        config = config.with_metadata(false);
    }
    config
}

/// Exit code for a finished run.
pub fn exit_code(summary: &ExportSummary) -> i32 {
    if summary.is_clean() {
        EXIT_SUCCESS
    } else {
        EXIT_PARTIAL
    }
}

/// Run the export command and return the process exit code.
pub fn run(args: ExportArgs) -> Result<i32, CliError> {
    let session = Session::start(&args.common, "export")?;
    let config = build_config(&args, session.config());

    let cancellation = CancellationToken::new();
    let handler_token = cancellation.clone();
    ctrlc::set_handler(move || {
        handler_token.cancel();
    })
    .map_err(|e| CliError::SignalHandler(e.to_string()))?;

    let staged = session
        .package_reader(args.staging_dir.as_deref())
        .open(&args.package)?;

    // Ctrl+C during extraction: stop before the output root is touched
    if cancellation.is_cancelled() {
        if let Err(e) = staged.close() {
            warn!(error = %e, "Failed to remove staging directory");
        }
        println!("{}", style("Export cancelled").yellow().bold());
        return Ok(EXIT_PARTIAL);
    }

    let package = staged.package();

    println!(
        "Exporting {} ({}, {}px) to {}",
        style(args.package.display()).bold(),
        package.format,
        package.tile_size,
        config.output_dir.display()
    );

    let requested = (!args.zooms.is_empty()).then_some(args.zooms.as_slice());
    let progress = Arc::new(BarProgress::new());
    let summary = staged
        .exporter(config)
        .with_cancellation(cancellation.clone())
        .with_progress(progress)
        .export_zoom_levels(requested)?;

    if let Err(e) = staged.close() {
        warn!(error = %e, "Failed to remove staging directory");
    }

    print_summary(&summary);
    info!(%summary, "Export complete");

    Ok(exit_code(&summary))
}

/// Bundle progress rendered with an indicatif bar on stderr.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(bar_style) =
            ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len} bundles ({eta})")
        {
            bar.set_style(bar_style.progress_chars("=> "));
        }
        bar.set_message("Exporting");
        Self { bar }
    }
}

impl ExportProgress for BarProgress {
    fn on_start(&self, bundles: usize) {
        self.bar.set_length(bundles as u64);
    }

    fn on_bundle_complete(&self, report: &BundleReport, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
        if let Some(reason) = &report.skipped {
            self.bar
                .println(format!("skipped {}: {}", report.path.display(), reason));
        }
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn print_summary(summary: &ExportSummary) {
    println!();
    let headline = if summary.cancelled {
        style("Export cancelled").yellow().bold()
    } else if summary.is_clean() {
        style("Export complete").green().bold()
    } else {
        style("Export finished with problems").yellow().bold()
    };
    println!("{}", headline);

    let zooms: Vec<String> = summary.zoom_levels.iter().map(u8::to_string).collect();
    println!("  Zoom levels:     {}", zooms.join(", "));
    println!(
        "  Bundles:         {}/{} exported",
        summary.bundles_exported, summary.bundles_total
    );
    println!("  Tiles written:   {}", summary.tiles_written);
    println!("  Empty slots:     {}", summary.empty_slots);
    println!("  Out of range:    {}", summary.out_of_range_slots);
    println!("  Failed tiles:    {}", summary.failed_tiles.len());
    if let Some(path) = &summary.metadata_path {
        println!("  Metadata:        {}", path.display());
    }

    if !summary.skipped_bundles.is_empty() {
        println!();
        println!("Skipped bundles ({}):", summary.skipped_bundles.len());
        for skipped in &summary.skipped_bundles {
            println!("  - {}: {}", skipped.path.display(), skipped.reason);
        }
    }

    if !summary.failed_tiles.is_empty() {
        println!();
        println!("Failed tiles ({}):", summary.failed_tiles.len());
        for failed in summary.failed_tiles.iter().take(MAX_LISTED_FAILURES) {
            println!("  - {} ({}): {}", failed.address, failed.bundle.display(), failed.reason);
        }
        if summary.failed_tiles.len() > MAX_LISTED_FAILURES {
            println!(
                "  ... and {} more",
                summary.failed_tiles.len() - MAX_LISTED_FAILURES
            );
        }
    }

    if !summary.warnings.is_empty() {
        println!();
        println!("Warnings ({}):", summary.warnings.len());
        for warning in &summary.warnings {
            println!("  - {}", warning);
        }
    }

    if summary.tiles_written == 0 && !summary.cancelled {
        println!();
        println!("{}", style("No tiles were written.").yellow());
    }
}
