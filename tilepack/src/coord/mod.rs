//! Web Mercator tile pyramid math.
//!
//! Maps the ground resolution declared by a cache's level of detail to the
//! standard power-of-two zoom level, and provides the global tile address type
//! used by the exporter.

use std::fmt;

/// Equatorial circumference of the earth in meters.
pub const EARTH_CIRCUMFERENCE_METERS: f64 = 40_075_016.69;

/// Tile edge length assumed when a caller has no better information.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Highest zoom level the resolver will produce.
pub const MAX_ZOOM: u8 = 30;

/// Maps a ground resolution to the nearest standard zoom level.
///
/// `zoom = round(log2(C / (resolution * tile_size)))` where `C` is
/// [`EARTH_CIRCUMFERENCE_METERS`]. Non-canonical resolutions snap to the
/// closest level. Results are clamped to `0..=MAX_ZOOM`, so a resolution
/// coarser than zoom 0 resolves to 0.
///
/// # Examples
///
/// ```
/// use tilepack::coord::resolve_zoom;
///
/// assert_eq!(resolve_zoom(156543.03, 256), 0);
/// assert_eq!(resolve_zoom(78271.52, 256), 1);
/// assert_eq!(resolve_zoom(4.777314, 256), 15);
/// ```
#[inline]
pub fn resolve_zoom(resolution: f64, tile_size: u32) -> u8 {
    let ground_span = resolution * f64::from(tile_size);
    let zoom = (EARTH_CIRCUMFERENCE_METERS / ground_span).log2().round();

    if zoom.is_nan() || zoom <= 0.0 {
        0
    } else if zoom >= f64::from(MAX_ZOOM) {
        MAX_ZOOM
    } else {
        zoom as u8
    }
}

/// Largest valid column or row index at `zoom`, i.e. `2^zoom - 1`.
#[inline]
pub fn max_tile_index(zoom: u8) -> u64 {
    (1u64 << zoom) - 1
}

/// Global address of one tile in the pyramid.
///
/// Columns grow eastward and rows grow southward from the north-west corner
/// of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    pub zoom: u8,
    pub column: u32,
    pub row: u32,
}

impl TileAddress {
    pub fn new(zoom: u8, column: u32, row: u32) -> Self {
        Self { zoom, column, row }
    }

    /// Whether both coordinates lie in `[0, 2^zoom - 1]`.
    ///
    /// Column and row are tested independently; a tile with one coordinate
    /// out of range is not addressable even if the other is fine.
    #[inline]
    pub fn is_within_pyramid(&self) -> bool {
        let max = max_tile_index(self.zoom);
        let column_ok = u64::from(self.column) <= max;
        let row_ok = u64::from(self.row) <= max;
        column_ok && row_ok
    }

    /// Row index counted from the south edge (TMS convention).
    ///
    /// Only meaningful for addresses inside the pyramid.
    #[inline]
    pub fn tms_row(&self) -> u32 {
        (max_tile_index(self.zoom) - u64::from(self.row)) as u32
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.column, self.row)
    }
}
