//! Synthetic tile packages for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Standard 256px Web Mercator resolutions for LOD 0..=4.
pub const WEB_MERCATOR: &[f64] = &[
    156543.033928,
    78271.5169639999,
    39135.7584820001,
    19567.8792409999,
    9783.93962049996,
];

const GRID: u32 = 128;

/// On-disk bundle layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleLayout {
    V1,
    V2,
}

/// One bundle: LOD folder, offsets and tiles keyed by local (column, row).
#[derive(Debug, Clone)]
pub struct BundleFixture {
    pub lod: u32,
    pub row_offset: u32,
    pub column_offset: u32,
    pub tiles: BTreeMap<(u32, u32), Vec<u8>>,
    pub layout: BundleLayout,
    /// Overrides the generated `R....C....` file stem.
    pub name: Option<String>,
}

impl BundleFixture {
    pub fn new(lod: u32, row_offset: u32, column_offset: u32) -> Self {
        Self {
            lod,
            row_offset,
            column_offset,
            tiles: BTreeMap::new(),
            layout: BundleLayout::V2,
            name: None,
        }
    }

    pub fn layout(mut self, layout: BundleLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Add a tile at local (column, row).
    pub fn tile(mut self, column: u32, row: u32, bytes: &[u8]) -> Self {
        self.tiles.insert((column, row), bytes.to_vec());
        self
    }

    fn stem(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            format!("R{:04x}C{:04x}", self.row_offset, self.column_offset)
        })
    }
}

/// Builds a `.tpk` archive.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    pub format: String,
    pub tile_size: u32,
    pub storage: String,
    pub levels: Vec<(u32, f64)>,
    pub title: String,
    pub bundles: Vec<BundleFixture>,
    pub layer_folder: String,
    pub legend_json: Option<String>,
}

impl Default for PackageBuilder {
    fn default() -> Self {
        Self {
            format: "PNG8".to_string(),
            tile_size: 256,
            storage: "esriMapCacheStorageModeCompactV2".to_string(),
            levels: WEB_MERCATOR.iter().enumerate().map(|(i, r)| (i as u32, *r)).collect(),
            title: "Synthetic basemap".to_string(),
            bundles: Vec::new(),
            layer_folder: "Layers".to_string(),
            legend_json: None,
        }
    }
}

impl PackageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    pub fn levels(mut self, levels: &[(u32, f64)]) -> Self {
        self.levels = levels.to_vec();
        self
    }

    pub fn bundle(mut self, bundle: BundleFixture) -> Self {
        self.bundles.push(bundle);
        self
    }

    pub fn layer_folder(mut self, folder: &str) -> Self {
        self.layer_folder = folder.to_string();
        self
    }

    pub fn legend(mut self, json: &str) -> Self {
        self.legend_json = Some(json.to_string());
        self
    }

    fn conf_xml(&self) -> String {
        let lods: String = self
            .levels
            .iter()
            .map(|(level, resolution)| {
                format!(
                    "<LODInfo><LevelID>{}</LevelID><Scale>0</Scale><Resolution>{}</Resolution></LODInfo>",
                    level, resolution
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<CacheInfo xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <TileCacheInfo>
    <TileOrigin><X>-20037508.342787</X><Y>20037508.342787</Y></TileOrigin>
    <TileCols>{size}</TileCols>
    <TileRows>{size}</TileRows>
    <DPI>96</DPI>
    <LODInfos>{lods}</LODInfos>
  </TileCacheInfo>
  <TileImageInfo><CacheTileFormat>{format}</CacheTileFormat></TileImageInfo>
  <CacheStorageInfo><StorageFormat>{storage}</StorageFormat><PacketSize>128</PacketSize></CacheStorageInfo>
</CacheInfo>"#,
            size = self.tile_size,
            lods = lods,
            format = self.format,
            storage = self.storage,
        )
    }

    fn item_info(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<ESRI_ItemInformation>
  <title>{}</title>
  <summary>Integration fixture</summary>
  <tags><tag>basemap</tag><tag>test</tag></tags>
  <description>Generated for tests</description>
  <accessinformation>Test suite</accessinformation>
  <licenseinfo>Public domain</licenseinfo>
</ESRI_ItemInformation>"#,
            self.title
        )
    }

    fn service_json(&self) -> String {
        let legend = self
            .legend_json
            .as_ref()
            .map(|l| format!(r#", "legend": {}"#, l))
            .unwrap_or_default();
        format!(
            r#"{{"resourceInfo": {{"geoFullExtent": {{"xmin": -180, "ymin": -85.05, "xmax": 180, "ymax": 85.05}}{}}}}}"#,
            legend
        )
    }

    /// Write the package to `dir/name` and return its path.
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default();

        let layer_root = format!("v101/{}", self.layer_folder);
        add_file(&mut zip, &format!("{}/conf.xml", layer_root), self.conf_xml().as_bytes(), options);
        add_file(&mut zip, "esriinfo/iteminfo.xml", self.item_info().as_bytes(), options);
        add_file(
            &mut zip,
            "servicedescriptions/mapserver/mapserver.json",
            self.service_json().as_bytes(),
            options,
        );

        for bundle in &self.bundles {
            let base = format!("{}/_alllayers/L{:02}/{}", layer_root, bundle.lod, bundle.stem());
            match bundle.layout {
                BundleLayout::V2 => {
                    add_file(&mut zip, &format!("{}.bundle", base), &v2_bundle(&bundle.tiles), options)
                }
                BundleLayout::V1 => {
                    let (data, index) = v1_bundle(&bundle.tiles);
                    add_file(&mut zip, &format!("{}.bundle", base), &data, options);
                    add_file(&mut zip, &format!("{}.bundlx", base), &index, options);
                }
            }
        }

        zip.finish().unwrap();
        path
    }
}

fn add_file(zip: &mut ZipWriter<File>, name: &str, bytes: &[u8], options: SimpleFileOptions) {
    zip.start_file(name, options).unwrap();
    zip.write_all(bytes).unwrap();
}

/// Compact V2 bundle: 64-byte header, row-major 8-byte index, tile data.
pub fn v2_bundle(tiles: &BTreeMap<(u32, u32), Vec<u8>>) -> Vec<u8> {
    let slots = (GRID * GRID) as usize;
    let data_start = 64 + slots as u64 * 8;
    let mut index = vec![0u64; slots];
    let mut body = Vec::new();

    for ((column, row), bytes) in tiles {
        body.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        let offset = data_start + body.len() as u64;
        body.extend_from_slice(bytes);
        index[(row * GRID + column) as usize] = ((bytes.len() as u64) << 40) | offset;
    }

    let mut out = vec![0u8; 64];
    for entry in index {
        out.extend_from_slice(&entry.to_le_bytes());
    }
    out.extend_from_slice(&body);
    out
}

/// Compact V1 bundle: `.bundle` data and a column-major 5-byte `.bundlx` index.
pub fn v1_bundle(tiles: &BTreeMap<(u32, u32), Vec<u8>>) -> (Vec<u8>, Vec<u8>) {
    let slots = (GRID * GRID) as usize;
    let mut data = vec![0u8; 60];
    let empty = data.len() as u64;
    data.extend_from_slice(&0u32.to_le_bytes());

    let mut offsets = vec![empty; slots];
    for ((column, row), bytes) in tiles {
        offsets[(column * GRID + row) as usize] = data.len() as u64;
        data.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        data.extend_from_slice(bytes);
    }

    let mut index = vec![0u8; 16];
    for offset in offsets {
        index.extend_from_slice(&offset.to_le_bytes()[..5]);
    }
    index.extend_from_slice(&[0u8; 16]);

    (data, index)
}

/// Relative paths of every file below `root`, sorted.
pub fn list_files(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                out.push(path.strip_prefix(root).unwrap().to_string_lossy().into_owned());
            }
        }
    }

    let mut files = Vec::new();
    if root.exists() {
        walk(root, root, &mut files);
    }
    files.sort();
    files
}
