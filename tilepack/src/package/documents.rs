//! Parsers for the documents inside a tile package.
//!
//! Three documents describe a package:
//!
//! | Document | Content |
//! |----------|---------|
//! | `conf.xml` | tile codec, tile size, storage mode, LOD ladder |
//! | `iteminfo.xml` | title, summary, tags, description, credits, use constraints |
//! | `mapserver.json` | geographic extent, legend |
//!
//! Each parser takes the document text and returns plain values; reading
//! files and staging the archive is the reader's job.

use roxmltree::{Document, Node};
use serde::Deserialize;
use serde_json::Value;

use super::types::{LegendElement, LegendLayer, LevelOfDetail, StorageFormat};
use crate::error::{PackageError, PackageResult};

/// Relative path of the map-configuration document.
pub const MAP_CONFIG_PATH: &str = "v101/Layers/conf.xml";

/// Relative path of the item-info document.
pub const ITEM_INFO_PATH: &str = "esriinfo/iteminfo.xml";

/// Relative path of the service-description document.
pub const SERVICE_DESCRIPTION_PATH: &str = "servicedescriptions/mapserver/mapserver.json";

const MAP_CONFIG: &str = "conf.xml";
const ITEM_INFO: &str = "iteminfo.xml";
const SERVICE_DESCRIPTION: &str = "mapserver.json";

/// Tiling scheme read from `conf.xml`.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub format: String,
    pub tile_size: u32,
    pub storage: StorageFormat,
    pub lods: Vec<LevelOfDetail>,
}

/// Descriptive metadata read from `iteminfo.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemInfo {
    pub title: String,
    pub summary: String,
    pub tags: String,
    pub description: String,
    pub credits: String,
    pub use_constraints: String,
}

/// Extent and legend read from `mapserver.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescription {
    pub bounds: [f64; 4],
    pub legend: Vec<LegendLayer>,
}

/// First descendant element with the given local name.
fn find_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// Trimmed text of the first descendant element with the given local name.
fn element_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    find_element(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
}

fn parse_xml<'input>(document: &str, text: &'input str) -> PackageResult<Document<'input>> {
    Document::parse(text).map_err(|e| PackageError::format(document, e.to_string()))
}

/// Parse the map-configuration document.
///
/// The codec, the tile size and at least one LOD are required. Each LOD needs
/// an integer `LevelID` and a positive finite `Resolution`.
pub fn parse_map_config(text: &str) -> PackageResult<MapConfig> {
    let doc = parse_xml(MAP_CONFIG, text)?;
    let root = doc.root_element();

    let format = element_text(root, "CacheTileFormat")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PackageError::format(MAP_CONFIG, "missing CacheTileFormat"))?
        .to_string();

    let tile_size_text = element_text(root, "TileCols")
        .ok_or_else(|| PackageError::format(MAP_CONFIG, "missing TileCols"))?;
    let tile_size = tile_size_text
        .parse::<u32>()
        .ok()
        .filter(|size| *size > 0)
        .ok_or_else(|| {
            PackageError::format(MAP_CONFIG, format!("invalid TileCols '{}'", tile_size_text))
        })?;

    let storage = element_text(root, "StorageFormat")
        .map(StorageFormat::from_declared)
        .unwrap_or_else(|| StorageFormat::Other(String::new()));

    let lod_infos = find_element(root, "LODInfos")
        .ok_or_else(|| PackageError::format(MAP_CONFIG, "missing LODInfos"))?;

    let mut lods = Vec::new();
    for info in lod_infos
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "LODInfo")
    {
        let level_text = element_text(info, "LevelID")
            .ok_or_else(|| PackageError::format(MAP_CONFIG, "LODInfo without LevelID"))?;
        let level = level_text.parse::<u32>().map_err(|_| {
            PackageError::format(MAP_CONFIG, format!("invalid LevelID '{}'", level_text))
        })?;

        let resolution_text = element_text(info, "Resolution").ok_or_else(|| {
            PackageError::format(MAP_CONFIG, format!("LOD {} without Resolution", level))
        })?;
        let resolution = resolution_text
            .parse::<f64>()
            .ok()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| {
                PackageError::format(
                    MAP_CONFIG,
                    format!("invalid Resolution '{}' for LOD {}", resolution_text, level),
                )
            })?;

        lods.push(LevelOfDetail::new(level, resolution, tile_size));
    }

    if lods.is_empty() {
        return Err(PackageError::format(MAP_CONFIG, "no levels of detail declared"));
    }

    Ok(MapConfig {
        format,
        tile_size,
        storage,
        lods,
    })
}

/// Parse the item-info document.
///
/// Absent fields default to empty strings. Tags are either plain text or a
/// list of `<tag>` children, which are joined with `", "`.
pub fn parse_item_info(text: &str) -> PackageResult<ItemInfo> {
    let doc = parse_xml(ITEM_INFO, text)?;
    let root = doc.root_element();

    let field = |name: &str| element_text(root, name).unwrap_or_default().to_string();

    let tags = match find_element(root, "tags") {
        Some(tags) => {
            let children: Vec<&str> = tags
                .children()
                .filter(|n| n.is_element())
                .filter_map(|n| n.text())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect();
            if children.is_empty() {
                tags.text().unwrap_or_default().trim().to_string()
            } else {
                children.join(", ")
            }
        }
        None => String::new(),
    };

    Ok(ItemInfo {
        title: field("title"),
        summary: field("summary"),
        tags,
        description: field("description"),
        credits: field("accessinformation"),
        use_constraints: field("licenseinfo"),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceDocument {
    resource_info: ResourceInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceInfo {
    geo_full_extent: Option<Extent>,
    legend: Option<LegendDocument>,
}

#[derive(Debug, Deserialize)]
struct Extent {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

#[derive(Debug, Deserialize)]
struct LegendDocument {
    #[serde(default)]
    layers: Vec<LegendLayerDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegendLayerDocument {
    layer_name: String,
    #[serde(default)]
    legend: Vec<LegendEntryDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegendEntryDocument {
    label: Option<String>,
    #[serde(default)]
    values: Vec<Value>,
    #[serde(default)]
    image_data: String,
    #[serde(default = "default_content_type")]
    content_type: String,
}

fn default_content_type() -> String {
    "image/png".to_string()
}

impl LegendEntryDocument {
    fn into_element(self) -> LegendElement {
        let label = match self.label.filter(|l| !l.trim().is_empty()) {
            Some(label) => Some(label),
            None => {
                let values: Vec<String> = self
                    .values
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                (!values.is_empty()).then(|| values.join(", "))
            }
        };

        LegendElement {
            image_data: format!("data:{};base64,{}", self.content_type, self.image_data),
            label,
        }
    }
}

/// Parse the service-description document.
///
/// The geographic extent is required. The legend is optional; a layer entry's
/// label falls back to its comma-joined values.
pub fn parse_service_description(text: &str) -> PackageResult<ServiceDescription> {
    let doc: ServiceDocument = serde_json::from_str(text)
        .map_err(|e| PackageError::format(SERVICE_DESCRIPTION, e.to_string()))?;

    let extent = doc
        .resource_info
        .geo_full_extent
        .ok_or_else(|| PackageError::format(SERVICE_DESCRIPTION, "missing geoFullExtent"))?;

    let legend = doc
        .resource_info
        .legend
        .map(|legend| {
            legend
                .layers
                .into_iter()
                .map(|layer| LegendLayer {
                    name: layer.layer_name,
                    elements: layer
                        .legend
                        .into_iter()
                        .map(LegendEntryDocument::into_element)
                        .collect(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ServiceDescription {
        bounds: [extent.xmin, extent.ymin, extent.xmax, extent.ymax],
        legend,
    })
}
