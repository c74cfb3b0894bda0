//! Turns raw map data into renderable features.
//!
//! Ways are converted first, since relation rings are stitched from the paths of their
//! member ways. Relation member ways get a path even when they are not drawn on their own.

use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::data::osm::{Element, ElementKind, OsmId, Relation};
use crate::data::semantic::{Connector, MapCoords, PathPoint, ProcessedData, RenderableFeature};
use crate::data::OsmData;

use super::boundary::assemble_rings;
use super::classify::{classify, is_displayable_relation, requires_path_geometry};
use super::path::{build_path, ProjectedPath, SimplificationStats};
use super::projection::Projector;
use super::rings::{stitch_rings, Fragment};

fn displayable_relations(data: &OsmData) -> Vec<(&Element, &Relation)> {
    data.elements.iter()
        .filter(|element| is_displayable_relation(element))
        .filter_map(|element| match element {
            Element::Relation(relation) => Some((element, relation)),
            _ => None,
        })
        .collect()
}

fn member_ways(relation: &Relation) -> Vec<OsmId> {
    let mut seen = HashSet::new();
    relation.members.iter()
        .filter(|member| member.kind == ElementKind::Way && seen.insert(member.id))
        .map(|member| member.id)
        .collect()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// Classifies every element and builds the geometry of everything that gets drawn.
pub fn process_map(data: &OsmData, projector: &Projector) -> ProcessedData {
    let nodes = data.node_lookup();
    let relations = displayable_relations(data);
    let relation_ways: HashSet<OsmId> = relations.iter()
        .flat_map(|(_, relation)| member_ways(relation))
        .collect();

    let mut stats = SimplificationStats::default();
    let mut member_paths: HashMap<OsmId, ProjectedPath> = HashMap::new();
    let mut features = Vec::new();

    for element in &data.elements {
        let Element::Way(way) = element else { continue };
        if !requires_path_geometry(element, &relation_ways) {
            continue;
        }
        let Some(path) = build_path(way, &nodes, projector, &mut stats) else {
            debug!(id = way.id; "Dropping way without resolvable nodes");
            continue;
        };

        let feature = classify(element);
        if feature.draw {
            features.push(RenderableFeature {
                id: way.id,
                element: ElementKind::Way,
                feature,
                is_multi_path: false,
                path: path.to_path_points(),
                rings: Vec::new(),
            });
        }
        if relation_ways.contains(&way.id) {
            member_paths.insert(way.id, path);
        }
    }

    let page = projector.page();
    for element in &data.elements {
        let Element::Node(node) = element else { continue };
        let feature = classify(element);
        if !feature.draw {
            continue;
        }
        let point = projector.project(&MapCoords::new(node.lat, node.lon));
        if !page.contains(point) {
            continue;
        }
        features.push(RenderableFeature {
            id: node.id,
            element: ElementKind::Node,
            feature,
            is_multi_path: false,
            path: vec![PathPoint::new(point.x, point.y, Connector::Move)],
            rings: Vec::new(),
        });
    }

    for (element, relation) in relations {
        let fragments: Vec<Fragment> = member_ways(relation).iter()
            .filter_map(|id| member_paths.get(id))
            .map(Fragment::from)
            .collect();
        if fragments.is_empty() {
            debug!(id = relation.id; "Dropping relation without member geometry");
            continue;
        }

        let rings = stitch_rings(&fragments);
        let path = assemble_rings(&rings, &member_paths, &page);
        if path.is_empty() {
            continue;
        }
        features.push(RenderableFeature {
            id: relation.id,
            element: ElementKind::Relation,
            feature: classify(element),
            is_multi_path: rings.len() > 1,
            path,
            rings,
        });
    }

    info!(before = stats.before, after = stats.after, features = features.len(); "Simplified paths");

    ProcessedData {
        timestamp: now_millis(),
        source_timestamp: data.source_timestamp.clone(),
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::osm::{Member, Node, Tags, Way};
    use crate::data::semantic::{BoundingBox, FeatureType};

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn projector() -> Projector {
        Projector::new(
            &BoundingBox::new(MapCoords::new(47.69, 11.74), MapCoords::new(47.70, 11.76)),
            25000.0,
        ).unwrap()
    }

    fn node(id: OsmId, lat: f64, lon: f64) -> Element {
        Element::Node(Node { id, lat, lon, tags: Tags::new() })
    }

    fn way(id: OsmId, nodes: &[OsmId], pairs: &[(&str, &str)]) -> Element {
        Element::Way(Way { id, nodes: nodes.to_vec(), tags: tags(pairs) })
    }

    fn grid_nodes() -> Vec<Element> {
        vec![
            node(1, 47.692, 11.742),
            node(2, 47.692, 11.758),
            node(3, 47.698, 11.758),
            node(4, 47.698, 11.742),
        ]
    }

    #[test]
    fn untagged_relation_members_are_not_drawn_alone() {
        let mut elements = grid_nodes();
        elements.push(way(10, &[1, 2, 3], &[]));
        elements.push(way(11, &[3, 4, 1], &[]));
        elements.push(Element::Relation(Relation {
            id: 100,
            members: vec![
                Member { kind: ElementKind::Way, id: 10, role: "outer".into() },
                Member { kind: ElementKind::Way, id: 11, role: "outer".into() },
                Member { kind: ElementKind::Way, id: 10, role: "outer".into() },
            ],
            tags: tags(&[("type", "multipolygon"), ("landuse", "meadow")]),
        }));

        let processed = process_map(&OsmData::new(elements), &projector());
        assert_eq!(processed.features.len(), 1);
        let meadow = &processed.features[0];
        assert_eq!(meadow.id, 100);
        assert_eq!(meadow.element, ElementKind::Relation);
        assert_eq!(meadow.feature.category.feature_type, Some(FeatureType::Land));
        assert!(!meadow.is_multi_path);
        assert_eq!(meadow.rings.len(), 1);
        assert_eq!(meadow.rings[0].len(), 2);
        assert!(processed.timestamp > 0);
    }

    #[test]
    fn pois_off_the_page_are_skipped() {
        let peak = |id, lat, lon| Element::Node(Node { id, lat, lon, tags: tags(&[("natural", "peak")]) });
        let elements = vec![peak(1, 47.695, 11.75), peak(2, 47.80, 11.75)];
        let processed = process_map(&OsmData::new(elements), &projector());
        assert_eq!(processed.features.len(), 1);
        assert_eq!(processed.features[0].id, 1);
        assert!(processed.features[0].feature.is_point);
        assert_eq!(processed.features[0].path.len(), 1);
    }

    #[test]
    fn ways_without_nodes_are_dropped() {
        let elements = vec![way(10, &[1, 2], &[("highway", "primary")])];
        let processed = process_map(&OsmData::new(elements), &projector());
        assert!(processed.features.is_empty());
    }

    #[test]
    fn source_timestamp_is_carried_over() {
        let mut data = OsmData::new(grid_nodes());
        data.source_timestamp = Some("2024-05-01T12:00:00Z".into());
        let processed = process_map(&data, &projector());
        assert_eq!(processed.source_timestamp.as_deref(), Some("2024-05-01T12:00:00Z"));
    }
}
