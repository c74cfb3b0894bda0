use std::fmt;

use super::osm::{ElementKind, OsmId};

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq)]
pub struct MapCoords {
    pub lat: f64,
    pub lon: f64,
}

impl MapCoords {
    pub fn new(lat: f64, lon: f64) -> Self {
        MapCoords { lat, lon }
    }
}

/// Geographic window of a map, given by its lower-left and upper-right corners in degrees.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub ll: MapCoords,
    pub ur: MapCoords,
}

impl BoundingBox {
    pub fn new(ll: MapCoords, ur: MapCoords) -> Self {
        BoundingBox { ll, ur }
    }

    pub fn is_valid(&self) -> bool {
        self.ll.lat < self.ur.lat && self.ll.lon < self.ur.lon
    }
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[archive(check_bytes)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Water,
    Land,
    Road,
    Railway,
    Building,
    Poi,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Water => "water",
            FeatureType::Land => "land",
            FeatureType::Road => "road",
            FeatureType::Railway => "railway",
            FeatureType::Building => "building",
            FeatureType::Poi => "poi",
        }
    }
}

/// What a feature is, as far as styling is concerned. Undrawn elements keep the empty
/// category.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, serde::Deserialize, serde::Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[archive(check_bytes)]
pub struct FeatureCategory {
    #[serde(rename = "type")]
    pub feature_type: Option<FeatureType>,
    pub subtype: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub surface: Option<String>,
}

impl FeatureCategory {
    pub fn new(feature_type: FeatureType, subtype: &str) -> Self {
        FeatureCategory {
            feature_type: Some(feature_type),
            subtype: subtype.to_string(),
            service: None,
            surface: None,
        }
    }
}

impl fmt::Display for FeatureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let feature_type = self.feature_type.map(|t| t.as_str()).unwrap_or("none");
        write!(f, "{}={}", feature_type, self.subtype)?;
        if let Some(service) = &self.service {
            write!(f, " service={}", service)?;
        }
        if let Some(surface) = &self.surface {
            write!(f, " surface={}", surface)?;
        }
        Ok(())
    }
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, serde::Deserialize, serde::Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[archive(check_bytes)]
pub struct ClassifiedFeature {
    pub draw: bool,
    pub is_area: bool,
    /// A way usable by people: roads, tracks and railways.
    pub is_way: bool,
    pub is_path: bool,
    pub is_point: bool,
    pub is_tunnel: bool,
    pub is_bridge: bool,
    pub category: FeatureCategory,
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[archive(check_bytes)]
pub enum Connector {
    Move,
    Line,
}

impl Connector {
    pub fn as_char(&self) -> char {
        match self {
            Connector::Move => 'M',
            Connector::Line => 'L',
        }
    }
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq)]
#[archive(check_bytes)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    pub connection: Connector,
}

impl PathPoint {
    pub fn new(x: f64, y: f64, connection: Connector) -> Self {
        PathPoint { x, y, connection }
    }
}

/// One member way of a relation, placed into a ring. `start` and `end` are the node ids at
/// the fragment's effective ends, i.e. after applying `reverse`.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[archive(check_bytes)]
pub struct OrientedFragment {
    pub way_id: OsmId,
    pub start: OsmId,
    pub end: OsmId,
    pub reverse: bool,
}

/// A classified feature with its assembled geometry in page coordinates.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct RenderableFeature {
    pub id: OsmId,
    pub element: ElementKind,
    pub feature: ClassifiedFeature,
    /// Set when the geometry holds more than one ring; such paths are filled even-odd.
    pub is_multi_path: bool,
    pub path: Vec<PathPoint>,
    /// Ring structure of relation features. Empty for ways and nodes.
    #[serde(default)]
    pub rings: Vec<Vec<OrientedFragment>>,
}

/// The intermediate artifact. Geometry depends on the scale it was projected at, so a cached
/// copy is only valid for the same bounding box and scale.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, serde::Deserialize, serde::Serialize, Debug, Clone, Default, PartialEq)]
#[archive(check_bytes)]
pub struct ProcessedData {
    /// Creation time in milliseconds since the unix epoch.
    pub timestamp: u64,
    #[serde(default)]
    pub source_timestamp: Option<String>,
    pub features: Vec<RenderableFeature>,
}
