//! Compact cache bundles.
//!
//! - [`address`](parse_bundle_address): decodes `L{nn}/R{rrrr}C{cccc}.bundle` paths
//! - [`discover_bundles`] / [`locate_bundles`]: find bundles and filter them by zoom
//! - [`BundleDecoder`] / [`TileReader`]: read tile bytes out of a bundle

mod address;
mod decoder;
mod locator;

pub use address::{parse_bundle_address, BundleAddress};
pub use decoder::{
    BundleDecoder, CompactBundleDecoder, CompactV1Reader, CompactV2Reader, TileReader,
    BUNDLE_GRID_SIZE,
};
pub use locator::{
    discover_bundles, locate_bundles, BundleFile, LocatedBundles, RejectedBundle, CACHE_LAYER_DIR,
};
