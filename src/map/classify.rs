//! Maps raw elements onto drawable feature descriptors.
//!
//! Tag checks for ways and relations run in a fixed order (natural, landuse, waterway,
//! highway, railway, building) and the first one that matches decides the category.

use std::collections::HashSet;

use crate::data::osm::{Element, Node, OsmId, Tags};
use crate::data::semantic::{ClassifiedFeature, FeatureCategory, FeatureType};

const POI_NATURALS: &[&str] = &["peak", "hill"];

const AREA_NATURALS: &[&str] = &[
    "wood", "scrub", "heath", "grassland", "fell", "bare_rock", "scree", "shingle", "sand",
    "mud", "water", "wetland", "glacier", "beach", "spring", "hot_spring", "blowhole",
];

const WATER_NATURALS: &[&str] = &["water", "spring", "hot_spring", "blowhole"];

const AREA_LANDUSES: &[&str] = &[
    "commercial", "construction", "industrial", "residential", "retail", "allotments",
    "basin", "brownfield", "cemetery", "farmland", "farmyard", "forest", "garages", "grass",
    "greenfield", "greenhouse_horticulture", "landfill", "meadow", "military", "orchard",
    "plant_nursery", "quarry", "railway", "recreation_ground", "religious", "reservoir",
    "salt_pond", "village_green", "vineyard",
];

const WATER_LANDUSES: &[&str] = &["basin", "salt_pond"];

const LINEAR_WATERWAYS: &[&str] = &["river", "stream", "canal", "drain", "ditch"];

const HIGHWAYS: &[&str] = &[
    "motorway", "trunk", "primary", "secondary", "tertiary", "road", "motorway_link",
    "trunk_link", "primary_link", "secondary_link", "tertiary_link", "unclassified",
    "residential", "living_street", "service", "pedestrian", "track", "footway", "bridleway",
    "steps", "path", "cycleway",
];

const EXCLUDED_RAILWAYS: &[&str] = &["abandoned", "subway", "platform"];

/// Classifies one raw element. Total: elements that match nothing come back undrawn with an
/// empty category.
pub fn classify(element: &Element) -> ClassifiedFeature {
    match element {
        Element::Node(node) => classify_node(node),
        Element::Way(way) => classify_tags(&way.tags),
        Element::Relation(relation) => classify_tags(&relation.tags),
    }
}

fn classify_node(node: &Node) -> ClassifiedFeature {
    let mut feature = ClassifiedFeature::default();
    if let Some(natural) = node.tags.get("natural") {
        if POI_NATURALS.contains(&natural.as_str()) {
            feature.draw = true;
            feature.is_point = true;
            feature.category = FeatureCategory::new(FeatureType::Poi, natural);
        }
    }
    feature
}

/// Any non-empty value sets the flag, `no` included.
fn has_flag(tags: &Tags, key: &str) -> bool {
    tags.get(key).is_some_and(|value| !value.is_empty())
}

fn classify_tags(tags: &Tags) -> ClassifiedFeature {
    let mut feature = ClassifiedFeature {
        is_tunnel: has_flag(tags, "tunnel"),
        is_bridge: has_flag(tags, "bridge"),
        ..Default::default()
    };

    if let Some(natural) = tags.get("natural").map(String::as_str) {
        if AREA_NATURALS.contains(&natural) {
            let feature_type = if WATER_NATURALS.contains(&natural) {
                FeatureType::Water
            } else {
                FeatureType::Land
            };
            feature.draw = true;
            feature.is_area = true;
            feature.category = FeatureCategory::new(feature_type, natural);
            return feature;
        }
    }

    if let Some(landuse) = tags.get("landuse").map(String::as_str) {
        if AREA_LANDUSES.contains(&landuse) {
            let feature_type = if WATER_LANDUSES.contains(&landuse) {
                FeatureType::Water
            } else {
                FeatureType::Land
            };
            feature.draw = true;
            feature.is_area = true;
            feature.category = FeatureCategory::new(feature_type, landuse);
            return feature;
        }
    }

    if let Some(waterway) = tags.get("waterway").map(String::as_str) {
        if LINEAR_WATERWAYS.contains(&waterway) {
            feature.draw = true;
            feature.is_path = true;
            feature.category = FeatureCategory::new(FeatureType::Water, waterway);
            return feature;
        }
        if waterway == "riverbank" {
            feature.draw = true;
            feature.is_area = true;
            feature.category = FeatureCategory::new(FeatureType::Water, waterway);
            return feature;
        }
    }

    if let Some(highway) = tags.get("highway").map(String::as_str) {
        if HIGHWAYS.contains(&highway) {
            feature.draw = true;
            feature.is_path = true;
            feature.is_way = true;
            feature.category = FeatureCategory::new(FeatureType::Road, highway);
            feature.category.surface = tags.get("surface")
                .and_then(|surface| surface.split([':', ';']).next())
                .map(str::to_string);
            return feature;
        }
    }

    if let Some(railway) = tags.get("railway").map(String::as_str) {
        if !EXCLUDED_RAILWAYS.contains(&railway) {
            let subtype = if tags.contains_key("railway:preserved") {
                "preserved"
            } else {
                railway
            };
            feature.draw = true;
            feature.is_path = true;
            feature.is_way = true;
            feature.category = FeatureCategory::new(FeatureType::Railway, subtype);
            feature.category.service = tags.get("service").cloned();
            return feature;
        }
    }

    if let Some(building) = tags.get("building") {
        feature.draw = true;
        feature.is_area = true;
        feature.category = FeatureCategory::new(FeatureType::Building, building);
        return feature;
    }

    feature
}

/// Multipolygon relations whose own tags describe an area feature.
pub fn is_displayable_relation(element: &Element) -> bool {
    match element {
        Element::Relation(relation) => {
            relation.tags.get("type").is_some_and(|t| t == "multipolygon")
                && classify(element).is_area
        },
        _ => false,
    }
}

/// Whether a way's geometry has to be built: either it is drawn on its own, or it is a member
/// of a displayable relation.
pub fn requires_path_geometry(element: &Element, relation_ways: &HashSet<OsmId>) -> bool {
    match element {
        Element::Way(way) => relation_ways.contains(&way.id) || classify(element).draw,
        _ => false,
    }
}
