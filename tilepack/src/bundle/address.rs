//! Bundle address parsing.
//!
//! A compact cache names each bundle after the global row and column of its
//! top-left tile, inside a folder named after the LOD ordinal:
//!
//! ```text
//! _alllayers/L05/R0080C0100.bundle
//!            ^^^  ^^^^ ^^^^
//!            LOD  row  column (hexadecimal)
//! ```

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::AddressParseError;

/// Grid position of a bundle, decoded from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BundleAddress {
    /// Global row of the bundle's top-left tile.
    pub row_offset: u32,
    /// Global column of the bundle's top-left tile.
    pub column_offset: u32,
    /// LOD ordinal from the parent folder.
    pub lod: u32,
}

/// `R` + 4 hex digits + `C` + 4 hex digits, case-insensitive.
fn bundle_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^R([0-9a-f]{4})C([0-9a-f]{4})$").expect("bundle name pattern is valid")
    })
}

/// `L` + decimal digits.
fn lod_folder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^L([0-9]+)$").expect("LOD folder pattern is valid"))
}

/// Decode a bundle's grid address from its filename and parent folder name.
///
/// The filename may carry an extension (`R0000C0080.bundle`); only the stem
/// is matched.
///
/// # Examples
///
/// ```
/// use tilepack::bundle::parse_bundle_address;
///
/// let address = parse_bundle_address("R00A0C00B4.bundle", "L08").unwrap();
/// assert_eq!(address.row_offset, 160);
/// assert_eq!(address.column_offset, 180);
/// assert_eq!(address.lod, 8);
/// ```
pub fn parse_bundle_address(
    filename: &str,
    parent_folder: &str,
) -> Result<BundleAddress, AddressParseError> {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let invalid_name = || AddressParseError::InvalidFilename(filename.to_string());
    let captures = bundle_name_pattern()
        .captures(stem)
        .ok_or_else(invalid_name)?;

    let hex_field = |index: usize| {
        captures
            .get(index)
            .and_then(|m| u32::from_str_radix(m.as_str(), 16).ok())
            .ok_or_else(invalid_name)
    };
    let row_offset = hex_field(1)?;
    let column_offset = hex_field(2)?;

    let invalid_folder = || AddressParseError::InvalidLodFolder(parent_folder.to_string());
    let lod = lod_folder_pattern()
        .captures(parent_folder)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .ok_or_else(invalid_folder)?;

    Ok(BundleAddress {
        row_offset,
        column_offset,
        lod,
    })
}
