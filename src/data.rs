use std::collections::HashMap;

use self::osm::{Element, Node, OsmId};

pub mod osm;
pub mod semantic;

/// Map data as delivered by the data source. Elements are kept in source order and are never
/// modified by the pipeline.
#[derive(serde::Deserialize, serde::Serialize, Debug, Default, Clone, PartialEq)]
pub struct OsmData {
    pub elements: Vec<Element>,
    /// Snapshot time of the source database, if the source reported one.
    #[serde(default)]
    pub source_timestamp: Option<String>,
}

impl OsmData {
    pub fn new(elements: Vec<Element>) -> Self {
        OsmData {
            elements,
            source_timestamp: None,
        }
    }

    pub fn node_lookup(&self) -> HashMap<OsmId, &Node> {
        self.elements.iter()
            .filter_map(|el| match el {
                Element::Node(node) => Some((node.id, node)),
                _ => None,
            })
            .collect()
    }
}
