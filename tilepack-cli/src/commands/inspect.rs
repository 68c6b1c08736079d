//! Inspect command: describe a package without exporting it.

use std::fmt::Write as _;
use std::path::PathBuf;

use clap::Args;
use console::style;

use tilepack::bundle::discover_bundles;
use tilepack::package::{StorageFormat, TilePackage};

use super::common::{CommonArgs, Session};
use crate::error::CliError;

/// Arguments for `tilepack inspect`.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Tile package (.tpk) to inspect
    pub package: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Run the inspect command.
pub fn run(args: InspectArgs) -> Result<(), CliError> {
    let session = Session::start(&args.common, "inspect")?;
    let staged = session.package_reader(None).open(&args.package)?;
    let bundles = discover_bundles(staged.staging_root())?.len();

    println!("{}", style(args.package.display()).bold());
    print!("{}", render(staged.package(), bundles));
    Ok(())
}

fn storage_label(storage: &StorageFormat) -> String {
    match storage {
        StorageFormat::Compact => "compact (bundle + bundlx)".to_string(),
        StorageFormat::CompactV2 => "compact v2".to_string(),
        StorageFormat::Other(s) if s.is_empty() => "not declared".to_string(),
        StorageFormat::Other(s) => s.clone(),
    }
}

/// Human-readable package description.
pub fn render(package: &TilePackage, bundle_count: usize) -> String {
    let mut out = String::new();
    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };

    let _ = writeln!(out, "  Name:            {}", or_dash(&package.name));
    let _ = writeln!(out, "  Summary:         {}", or_dash(&package.summary));
    let _ = writeln!(out, "  Tags:            {}", or_dash(&package.tags));
    let _ = writeln!(out, "  Credits:         {}", or_dash(&package.credits));
    let _ = writeln!(out, "  Use constraints: {}", or_dash(&package.use_constraints));
    let mixed = if package.is_mixed() { " (not exportable)" } else { "" };
    let _ = writeln!(out, "  Tile format:     {}{}", package.format, mixed);
    let _ = writeln!(out, "  Tile size:       {}px", package.tile_size);
    let _ = writeln!(out, "  Storage:         {}", storage_label(&package.storage));
    let [west, south, east, north] = package.bounds;
    let _ = writeln!(
        out,
        "  Bounds:          W {:.6}  S {:.6}  E {:.6}  N {:.6}",
        west, south, east, north
    );
    let _ = writeln!(out, "  Bundles:         {}", bundle_count);
    let _ = writeln!(out, "  Legend layers:   {}", package.legend.len());

    let _ = writeln!(out);
    let _ = writeln!(out, "  LOD  Resolution (m/px)  Zoom");
    for lod in &package.lods {
        let _ = writeln!(
            out,
            "  L{:02}  {:>18.6}  {:>4}",
            lod.level, lod.resolution, lod.zoom
        );
    }

    out
}
