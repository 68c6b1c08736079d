//! Compact cache bundle decoding.
//!
//! A bundle packs up to `grid × grid` tiles (128 × 128 in practice) behind an
//! offset index. Two on-disk layouts exist:
//!
//! **Compact V1**: the index lives in a sibling `.bundlx` file:
//!
//! ```text
//! .bundlx: [16-byte header][grid² × 5-byte LE offset][16-byte footer]
//!          index = local_col * grid + local_row   (column-major)
//! .bundle: [60-byte header] ... at offset: [4-byte LE size][tile bytes]
//! ```
//!
//! **Compact V2**: the index is embedded in the `.bundle` header:
//!
//! ```text
//! .bundle: [64-byte header][grid² × 8-byte LE entry] ... tile bytes
//!          entry = size << 40 | offset
//!          index = local_row * grid + local_col   (row-major)
//! ```
//!
//! A zero size marks an unpopulated slot and decodes to an empty tile.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::coord::TileAddress;
use crate::error::TileIoError;

/// Tiles per bundle edge.
pub const BUNDLE_GRID_SIZE: u32 = 128;

const V1_INDEX_HEADER_LEN: u64 = 16;
const V1_INDEX_ENTRY_LEN: usize = 5;
const V2_HEADER_LEN: u64 = 64;
const V2_INDEX_ENTRY_LEN: usize = 8;
const V2_OFFSET_MASK: u64 = (1 << 40) - 1;

/// Opens bundles for tile reads.
///
/// Implementations are shared across export workers.
pub trait BundleDecoder: Send + Sync {
    /// Open the bundle at `bundle_path` with a `grid_size × grid_size` layout.
    fn open(&self, bundle_path: &Path, grid_size: u32) -> Result<Box<dyn TileReader>, TileIoError>;
}

/// Reads tiles out of one opened bundle.
pub trait TileReader: Send {
    /// Bytes of the tile at the given global address.
    ///
    /// Returns an empty vector for an unpopulated slot.
    fn get_tile(&mut self, column: u32, row: u32, zoom: u8) -> Result<Vec<u8>, TileIoError>;
}

/// Default decoder for compact caches.
///
/// Picks V1 when a `.bundlx` index sits next to the bundle and V2 otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompactBundleDecoder;

impl CompactBundleDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl BundleDecoder for CompactBundleDecoder {
    fn open(&self, bundle_path: &Path, grid_size: u32) -> Result<Box<dyn TileReader>, TileIoError> {
        match index_sibling(bundle_path) {
            Some(index_path) => Ok(Box::new(CompactV1Reader::open(
                bundle_path,
                &index_path,
                grid_size,
            )?)),
            None => Ok(Box::new(CompactV2Reader::open(bundle_path, grid_size)?)),
        }
    }
}

/// The `.bundlx` index next to a bundle, in either letter case.
fn index_sibling(bundle_path: &Path) -> Option<PathBuf> {
    ["bundlx", "BUNDLX"]
        .iter()
        .map(|ext| bundle_path.with_extension(ext))
        .find(|path| path.is_file())
}

fn open_error(path: &Path, reason: impl ToString) -> TileIoError {
    TileIoError::BundleOpen {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn fetch_error(column: u32, row: u32, zoom: u8, reason: impl ToString) -> TileIoError {
    TileIoError::Fetch {
        address: TileAddress::new(zoom, column, row),
        reason: reason.to_string(),
    }
}

/// Little-endian unsigned integer from up to 8 bytes.
fn read_le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

/// Shared state of an opened bundle data file.
struct BundleData {
    path: PathBuf,
    file: File,
    len: u64,
}

impl BundleData {
    fn open(path: &Path) -> Result<Self, TileIoError> {
        let file = File::open(path).map_err(|e| open_error(path, e))?;
        let len = file.metadata().map_err(|e| open_error(path, e))?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
        })
    }

    fn read_at(&mut self, offset: u64, len: u64) -> std::io::Result<Vec<u8>> {
        let end = offset.checked_add(len).filter(|end| *end <= self.len);
        if end.is_none() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "range {}+{} outside bundle {} ({} bytes)",
                    offset,
                    len,
                    self.path.display(),
                    self.len
                ),
            ));
        }

        let mut buffer = vec![0u8; len as usize];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}

/// Reader for compact V1 bundles (`.bundle` + `.bundlx`).
pub struct CompactV1Reader {
    data: BundleData,
    offsets: Vec<u64>,
    grid_size: u32,
}

impl CompactV1Reader {
    /// Open a V1 bundle and load its index.
    pub fn open(bundle_path: &Path, index_path: &Path, grid_size: u32) -> Result<Self, TileIoError> {
        let slots = (grid_size as usize) * (grid_size as usize);
        let index = std::fs::read(index_path).map_err(|e| open_error(index_path, e))?;

        let start = V1_INDEX_HEADER_LEN as usize;
        let end = start + slots * V1_INDEX_ENTRY_LEN;
        let entries = index.get(start..end).ok_or_else(|| {
            open_error(
                index_path,
                format!("index holds {} bytes, expected at least {}", index.len(), end),
            )
        })?;

        let offsets = entries.chunks_exact(V1_INDEX_ENTRY_LEN).map(read_le).collect();

        Ok(Self {
            data: BundleData::open(bundle_path)?,
            offsets,
            grid_size,
        })
    }
}

impl TileReader for CompactV1Reader {
    fn get_tile(&mut self, column: u32, row: u32, zoom: u8) -> Result<Vec<u8>, TileIoError> {
        let local_col = (column % self.grid_size) as usize;
        let local_row = (row % self.grid_size) as usize;
        let offset = self.offsets[local_col * self.grid_size as usize + local_row];

        let size_bytes = self
            .data
            .read_at(offset, 4)
            .map_err(|e| fetch_error(column, row, zoom, e))?;
        let size = read_le(&size_bytes);
        if size == 0 {
            return Ok(Vec::new());
        }

        self.data
            .read_at(offset + 4, size)
            .map_err(|e| fetch_error(column, row, zoom, e))
    }
}

/// Reader for compact V2 bundles (index in the `.bundle` header).
pub struct CompactV2Reader {
    data: BundleData,
    entries: Vec<u64>,
    grid_size: u32,
}

impl CompactV2Reader {
    /// Open a V2 bundle and load its embedded index.
    pub fn open(bundle_path: &Path, grid_size: u32) -> Result<Self, TileIoError> {
        let slots = (grid_size as usize) * (grid_size as usize);
        let mut data = BundleData::open(bundle_path)?;

        let index = data
            .read_at(V2_HEADER_LEN, (slots * V2_INDEX_ENTRY_LEN) as u64)
            .map_err(|e| open_error(bundle_path, format!("truncated index: {}", e)))?;
        let entries = index.chunks_exact(V2_INDEX_ENTRY_LEN).map(read_le).collect();

        Ok(Self {
            data,
            entries,
            grid_size,
        })
    }
}

impl TileReader for CompactV2Reader {
    fn get_tile(&mut self, column: u32, row: u32, zoom: u8) -> Result<Vec<u8>, TileIoError> {
        let local_col = (column % self.grid_size) as usize;
        let local_row = (row % self.grid_size) as usize;
        let entry = self.entries[local_row * self.grid_size as usize + local_col];

        let size = entry >> 40;
        if size == 0 {
            return Ok(Vec::new());
        }

        self.data
            .read_at(entry & V2_OFFSET_MASK, size)
            .map_err(|e| fetch_error(column, row, zoom, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const GRID: u32 = 4;

    /// Write a V2 bundle with the given (local_col, local_row, bytes) tiles.
    fn write_v2(path: &Path, grid: u32, tiles: &[(u32, u32, &[u8])]) {
        let slots = (grid * grid) as usize;
        let mut index = vec![0u64; slots];
        let mut body = Vec::new();
        let data_start = V2_HEADER_LEN + (slots * V2_INDEX_ENTRY_LEN) as u64;

        for (col, row, bytes) in tiles {
            body.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            let offset = data_start + body.len() as u64;
            body.extend_from_slice(bytes);
            index[(row * grid + col) as usize] = ((bytes.len() as u64) << 40) | offset;
        }

        let mut out = vec![0u8; V2_HEADER_LEN as usize];
        for entry in index {
            out.extend_from_slice(&entry.to_le_bytes());
        }
        out.extend_from_slice(&body);
        fs::write(path, out).unwrap();
    }

    /// Write a V1 bundle + bundlx pair. Empty slots point at a zero size field.
    fn write_v1(bundle: &Path, grid: u32, tiles: &[(u32, u32, &[u8])]) {
        let slots = (grid * grid) as usize;
        let mut data = vec![0u8; 60];
        let empty_offset = data.len() as u64;
        data.extend_from_slice(&0u32.to_le_bytes());

        let mut offsets = vec![empty_offset; slots];
        for (col, row, bytes) in tiles {
            offsets[(col * grid + row) as usize] = data.len() as u64;
            data.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            data.extend_from_slice(bytes);
        }

        let mut index = vec![0u8; V1_INDEX_HEADER_LEN as usize];
        for offset in offsets {
            index.extend_from_slice(&offset.to_le_bytes()[..V1_INDEX_ENTRY_LEN]);
        }
        index.extend_from_slice(&[0u8; 16]);

        fs::write(bundle, data).unwrap();
        fs::write(bundle.with_extension("bundlx"), index).unwrap();
    }

    #[test]
    fn test_read_le() {
        assert_eq!(read_le(&[0x01, 0x00, 0x00, 0x00, 0x00]), 1);
        assert_eq!(read_le(&[0x00, 0x01, 0x00, 0x00, 0x00]), 256);
        assert_eq!(read_le(&[0xff, 0xff, 0xff, 0xff, 0xff]), (1 << 40) - 1);
    }

    #[test]
    fn test_v2_reads_populated_and_empty_slots() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("R0000C0000.bundle");
        write_v2(&path, GRID, &[(1, 2, b"tile-a"), (3, 0, b"tile-bb")]);

        let mut reader = CompactBundleDecoder::new().open(&path, GRID).unwrap();
        assert_eq!(reader.get_tile(1, 2, 2).unwrap(), b"tile-a");
        assert_eq!(reader.get_tile(3, 0, 2).unwrap(), b"tile-bb");
        assert!(reader.get_tile(0, 0, 2).unwrap().is_empty());
    }

    #[test]
    fn test_v2_uses_local_coordinates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("R0004C0008.bundle");
        write_v2(&path, GRID, &[(1, 3, b"offset tile")]);

        let mut reader = CompactBundleDecoder::new().open(&path, GRID).unwrap();
        // Global column 9 = 8 + 1, global row 7 = 4 + 3
        assert_eq!(reader.get_tile(9, 7, 4).unwrap(), b"offset tile");
    }

    #[test]
    fn test_v1_reads_with_column_major_index() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("R0000C0000.bundle");
        write_v1(&path, GRID, &[(2, 1, b"v1 tile"), (1, 2, b"other")]);

        let mut reader = CompactBundleDecoder::new().open(&path, GRID).unwrap();
        assert_eq!(reader.get_tile(2, 1, 2).unwrap(), b"v1 tile");
        assert_eq!(reader.get_tile(1, 2, 2).unwrap(), b"other");
        assert!(reader.get_tile(3, 3, 2).unwrap().is_empty());
    }

    #[test]
    fn test_v1_upper_case_pair_is_detected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("R0000C0000.BUNDLE");
        write_v1(&path, GRID, &[(2, 1, b"v1 tile")]);
        fs::rename(
            path.with_extension("bundlx"),
            path.with_extension("BUNDLX"),
        )
        .unwrap();

        let mut reader = CompactBundleDecoder::new().open(&path, GRID).unwrap();
        assert_eq!(reader.get_tile(2, 1, 2).unwrap(), b"v1 tile");
    }

    #[test]
    fn test_v2_truncated_index_fails_to_open() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("R0000C0000.bundle");
        fs::write(&path, vec![0u8; 80]).unwrap();

        let result = CompactBundleDecoder::new().open(&path, GRID);
        assert!(matches!(result, Err(TileIoError::BundleOpen { .. })));
    }

    #[test]
    fn test_v1_truncated_index_fails_to_open() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("R0000C0000.bundle");
        fs::write(&path, vec![0u8; 64]).unwrap();
        fs::write(path.with_extension("bundlx"), vec![0u8; 20]).unwrap();

        let result = CompactBundleDecoder::new().open(&path, GRID);
        assert!(matches!(result, Err(TileIoError::BundleOpen { .. })));
    }

    #[test]
    fn test_entry_past_end_of_file_is_fetch_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("R0000C0000.bundle");
        write_v2(&path, GRID, &[(0, 0, b"short")]);

        // Point slot (1, 0) at a range beyond the end of the file
        let mut raw = fs::read(&path).unwrap();
        let entry: u64 = (1000u64 << 40) | 10_000;
        let slot = V2_HEADER_LEN as usize + V2_INDEX_ENTRY_LEN;
        raw[slot..slot + 8].copy_from_slice(&entry.to_le_bytes());
        fs::write(&path, raw).unwrap();

        let mut reader = CompactBundleDecoder::new().open(&path, GRID).unwrap();
        assert_eq!(reader.get_tile(0, 0, 2).unwrap(), b"short");
        match reader.get_tile(1, 0, 2) {
            Err(TileIoError::Fetch { address, .. }) => {
                assert_eq!(address, TileAddress::new(2, 1, 0))
            }
            other => panic!("expected fetch error, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_missing_bundle_fails_to_open() {
        let temp = TempDir::new().unwrap();
        let result = CompactBundleDecoder::new().open(&temp.path().join("R0000C0000.bundle"), GRID);
        assert!(matches!(result, Err(TileIoError::BundleOpen { .. })));
    }
}
