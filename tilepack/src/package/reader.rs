//! Tile package loading.
//!
//! [`PackageReader::open`] stages the container in a per-invocation temporary
//! directory, reads the three package documents and returns a
//! [`StagedPackage`]. The staging directory belongs to the returned value and
//! is deleted when it is dropped, on success, on error and during unwinding.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info};

use super::archive::{ArchiveExtractor, ZipExtractor};
use super::documents::{
    parse_item_info, parse_map_config, parse_service_description, ITEM_INFO_PATH,
    MAP_CONFIG_PATH, SERVICE_DESCRIPTION_PATH,
};
use super::types::TilePackage;
use crate::bundle::CompactBundleDecoder;
use crate::config::ExportConfig;
use crate::error::{PackageError, PackageResult};
use crate::export::TileExporter;

/// Loads tile packages.
pub struct PackageReader {
    extractor: Box<dyn ArchiveExtractor>,
    staging_parent: Option<PathBuf>,
}

impl Default for PackageReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageReader {
    /// Create a reader using ZIP extraction and the system temp directory.
    pub fn new() -> Self {
        Self {
            extractor: Box::new(ZipExtractor::new()),
            staging_parent: None,
        }
    }

    /// Use a different archive extractor.
    pub fn with_extractor(mut self, extractor: Box<dyn ArchiveExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Create staging directories below `parent` instead of the system temp dir.
    pub fn with_staging_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.staging_parent = Some(parent.into());
        self
    }

    /// Stage and read a tile package.
    ///
    /// # Errors
    ///
    /// - [`PackageError::InvalidInput`] if `path` is empty, missing or not a file
    /// - [`PackageError::ContainerRead`] if the archive cannot be extracted or a
    ///   required document is missing
    /// - [`PackageError::PackageFormat`] if a document is malformed
    pub fn open(&self, path: &Path) -> PackageResult<StagedPackage> {
        validate_input(path)?;

        let staging = self.create_staging(path)?;
        let entries = self.extractor.extract(path, staging.path())?;
        debug!(
            package = %path.display(),
            staging = %staging.path().display(),
            entries,
            "Tile package staged"
        );

        let package = read_package(path, staging.path())?;
        info!(
            package = %path.display(),
            format = %package.format,
            tile_size = package.tile_size,
            lods = package.lods.len(),
            "Tile package loaded"
        );

        Ok(StagedPackage { package, staging })
    }

    fn create_staging(&self, package_path: &Path) -> PackageResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("tilepack-");

        let staging = match &self.staging_parent {
            Some(parent) => fs::create_dir_all(parent).and_then(|_| builder.tempdir_in(parent)),
            None => builder.tempdir(),
        };

        staging.map_err(|e| {
            PackageError::container(
                package_path,
                format!("cannot create staging directory: {}", e),
            )
        })
    }
}

fn validate_input(path: &Path) -> PackageResult<()> {
    if path.as_os_str().is_empty() {
        return Err(PackageError::InvalidInput(
            "no tile package path given".to_string(),
        ));
    }
    if !path.exists() {
        return Err(PackageError::InvalidInput(format!(
            "tile package not found: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(PackageError::InvalidInput(format!(
            "tile package is not a file: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Read the package documents from an already extracted tree.
pub fn read_package(package_path: &Path, root: &Path) -> PackageResult<TilePackage> {
    let map_config_path = locate_map_config(root)
        .ok_or_else(|| PackageError::container(package_path, format!("missing {}", MAP_CONFIG_PATH)))?;

    let map_config = parse_map_config(&read_document(package_path, &map_config_path)?)?;
    let item_info = parse_item_info(&read_document(package_path, &root.join(ITEM_INFO_PATH))?)?;
    let service = parse_service_description(&read_document(
        package_path,
        &root.join(SERVICE_DESCRIPTION_PATH),
    )?)?;

    Ok(TilePackage {
        format: map_config.format,
        tile_size: map_config.tile_size,
        storage: map_config.storage,
        lods: map_config.lods,
        name: item_info.title,
        summary: item_info.summary,
        tags: item_info.tags,
        description: item_info.description,
        credits: item_info.credits,
        use_constraints: item_info.use_constraints,
        bounds: service.bounds,
        legend: service.legend,
    })
}

/// `v101/Layers/conf.xml`, or the first `v101/*/conf.xml` for caches whose
/// layer folder carries the service name.
fn locate_map_config(root: &Path) -> Option<PathBuf> {
    let fixed = root.join(MAP_CONFIG_PATH);
    if fixed.is_file() {
        return Some(fixed);
    }

    let pattern = format!(
        "{}/v101/*/conf.xml",
        glob::Pattern::escape(&root.to_string_lossy())
    );
    let mut matches: Vec<PathBuf> = glob::glob(&pattern).ok()?.filter_map(Result::ok).collect();
    matches.sort();
    matches.into_iter().next()
}

fn read_document(package_path: &Path, document: &Path) -> PackageResult<String> {
    fs::read_to_string(document).map_err(|e| {
        let relative = document.file_name().unwrap_or(document.as_os_str());
        let reason = if e.kind() == io::ErrorKind::NotFound {
            format!("missing {}", Path::new(relative).display())
        } else {
            format!("cannot read {}: {}", Path::new(relative).display(), e)
        };
        PackageError::container(package_path, reason)
    })
}

/// A loaded tile package together with its staged contents.
///
/// Dropping this value removes the staging directory.
#[derive(Debug)]
pub struct StagedPackage {
    package: TilePackage,
    staging: TempDir,
}

impl StagedPackage {
    /// Package metadata and tiling scheme.
    pub fn package(&self) -> &TilePackage {
        &self.package
    }

    /// Root of the extracted package contents.
    pub fn staging_root(&self) -> &Path {
        self.staging.path()
    }

    /// Exporter over this package using the compact-bundle decoder.
    pub fn exporter(&self, config: ExportConfig) -> TileExporter<'_, CompactBundleDecoder> {
        TileExporter::new(
            &self.package,
            self.staging_root(),
            CompactBundleDecoder::new(),
            config,
        )
    }

    /// Remove the staging directory now and report failures.
    pub fn close(self) -> io::Result<()> {
        self.staging.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Extractor that copies a fixed set of documents instead of unzipping.
    struct FixtureExtractor {
        files: Vec<(&'static str, &'static str)>,
    }

    impl ArchiveExtractor for FixtureExtractor {
        fn extract(&self, _archive_path: &Path, dest_dir: &Path) -> PackageResult<usize> {
            for (relative, contents) in &self.files {
                let path = dest_dir.join(relative);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, contents).unwrap();
            }
            Ok(self.files.len())
        }
    }

    const CONF: &str = "<CacheInfo><TileCacheInfo><TileCols>256</TileCols><LODInfos>\
        <LODInfo><LevelID>0</LevelID><Resolution>156543.033928</Resolution></LODInfo>\
        <LODInfo><LevelID>1</LevelID><Resolution>78271.516964</Resolution></LODInfo>\
        </LODInfos></TileCacheInfo><TileImageInfo><CacheTileFormat>JPEG</CacheTileFormat>\
        </TileImageInfo></CacheInfo>";
    const ITEM: &str = "<ESRI_ItemInformation><title>Fixture</title></ESRI_ItemInformation>";
    const SERVICE: &str =
        r#"{"resourceInfo": {"geoFullExtent": {"xmin": -10, "ymin": -5, "xmax": 10, "ymax": 5}}}"#;

    fn fixture_reader(files: Vec<(&'static str, &'static str)>, staging: &Path) -> PackageReader {
        PackageReader::new()
            .with_extractor(Box::new(FixtureExtractor { files }))
            .with_staging_parent(staging)
    }

    fn complete_files() -> Vec<(&'static str, &'static str)> {
        vec![
            (MAP_CONFIG_PATH, CONF),
            (ITEM_INFO_PATH, ITEM),
            (SERVICE_DESCRIPTION_PATH, SERVICE),
        ]
    }

    fn dummy_package(dir: &Path) -> PathBuf {
        let path = dir.join("fixture.tpk");
        fs::write(&path, b"placeholder").unwrap();
        path
    }

    #[test]
    fn test_open_reads_all_documents() {
        let temp = TempDir::new().unwrap();
        let reader = fixture_reader(complete_files(), &temp.path().join("staging"));

        let staged = reader.open(&dummy_package(temp.path())).unwrap();
        let package = staged.package();

        assert_eq!(package.format, "JPEG");
        assert_eq!(package.name, "Fixture");
        assert_eq!(package.summary, "");
        assert_eq!(package.zoom_levels(), vec![0, 1]);
        assert_eq!(package.bounds, [-10.0, -5.0, 10.0, 5.0]);
    }

    #[test]
    fn test_staging_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        let reader = fixture_reader(complete_files(), &temp.path().join("staging"));

        let staged = reader.open(&dummy_package(temp.path())).unwrap();
        let staging = staged.staging_root().to_path_buf();
        assert!(staging.join(MAP_CONFIG_PATH).exists());

        drop(staged);
        assert!(!staging.exists());
    }

    #[test]
    fn test_staging_removed_on_error() {
        let temp = TempDir::new().unwrap();
        let staging_parent = temp.path().join("staging");
        let files = vec![(MAP_CONFIG_PATH, CONF), (ITEM_INFO_PATH, ITEM)];
        let reader = fixture_reader(files, &staging_parent);

        let result = reader.open(&dummy_package(temp.path()));

        match result {
            Err(PackageError::ContainerRead { reason, .. }) => {
                assert!(reason.contains("mapserver.json"))
            }
            other => panic!("expected ContainerRead, got {:?}", other),
        }
        assert_eq!(fs::read_dir(&staging_parent).unwrap().count(), 0);
    }

    #[test]
    fn test_map_config_found_under_named_layer_folder() {
        let temp = TempDir::new().unwrap();
        let files = vec![
            ("v101/Basemap/conf.xml", CONF),
            (ITEM_INFO_PATH, ITEM),
            (SERVICE_DESCRIPTION_PATH, SERVICE),
        ];
        let reader = fixture_reader(files, &temp.path().join("staging"));

        let staged = reader.open(&dummy_package(temp.path())).unwrap();
        assert_eq!(staged.package().format, "JPEG");
    }

    #[test]
    fn test_missing_map_config() {
        let temp = TempDir::new().unwrap();
        let files = vec![(ITEM_INFO_PATH, ITEM), (SERVICE_DESCRIPTION_PATH, SERVICE)];
        let reader = fixture_reader(files, &temp.path().join("staging"));

        let err = reader.open(&dummy_package(temp.path())).unwrap_err();
        assert!(err.to_string().contains("conf.xml"));
    }

    #[test]
    fn test_rejects_empty_path() {
        let reader = PackageReader::new();
        assert!(matches!(
            reader.open(Path::new("")),
            Err(PackageError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_missing_path() {
        let temp = TempDir::new().unwrap();
        let reader = PackageReader::new();
        assert!(matches!(
            reader.open(&temp.path().join("nope.tpk")),
            Err(PackageError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_directory_path() {
        let temp = TempDir::new().unwrap();
        let reader = PackageReader::new();
        assert!(matches!(
            reader.open(temp.path()),
            Err(PackageError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_close_reports_success() {
        let temp = TempDir::new().unwrap();
        let reader = fixture_reader(complete_files(), &temp.path().join("staging"));
        let staged = reader.open(&dummy_package(temp.path())).unwrap();
        let staging = staged.staging_root().to_path_buf();

        staged.close().unwrap();
        assert!(!staging.exists());
    }
}
