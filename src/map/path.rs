use std::collections::HashMap;

use geo::{Coord, LineString, Simplify};
use log::debug;

use crate::data::osm::{Node, OsmId, Way};
use crate::data::semantic::{Connector, MapCoords, PathPoint};

use super::projection::Projector;

/// Maximum deviation (output units) a dropped point may have from the simplified line.
pub const SIMPLIFY_TOLERANCE: f64 = 0.02;

pub type NodeLookup<'a> = HashMap<OsmId, &'a Node>;

/// A way projected onto the page. `start` and `end` are the first and last nodes that could
/// be resolved, used to stitch relation rings together.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPath {
    pub way_id: OsmId,
    pub points: Vec<Coord<f64>>,
    pub start: OsmId,
    pub end: OsmId,
}

impl ProjectedPath {
    /// Points in traversal order, reversed on request.
    pub fn oriented(&self, reverse: bool) -> Vec<Coord<f64>> {
        if reverse {
            self.points.iter().rev().copied().collect()
        } else {
            self.points.clone()
        }
    }

    pub fn to_path_points(&self) -> Vec<PathPoint> {
        self.points.iter()
            .enumerate()
            .map(|(idx, point)| {
                let connection = if idx == 0 { Connector::Move } else { Connector::Line };
                PathPoint::new(point.x, point.y, connection)
            })
            .collect()
    }
}

/// Point counts before and after simplification, summed over all built paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplificationStats {
    pub before: usize,
    pub after: usize,
}

/// Douglas-Peucker simplification. The first and last points always survive.
pub fn simplify(points: Vec<Coord<f64>>, tolerance: f64) -> Vec<Coord<f64>> {
    if points.len() < 3 {
        return points;
    }
    LineString::from(points).simplify(tolerance).0
}

/// Resolves, projects and simplifies a way. Node references missing from the lookup are
/// skipped. Returns `None` when nothing could be resolved.
pub fn build_path(
    way: &Way,
    nodes: &NodeLookup,
    projector: &Projector,
    stats: &mut SimplificationStats,
) -> Option<ProjectedPath> {
    let resolved: Vec<&Node> = way.nodes.iter()
        .filter_map(|id| {
            let node = nodes.get(id).copied();
            if node.is_none() {
                debug!(way = way.id, node = *id; "Skipping unresolved node reference");
            }
            node
        })
        .collect();

    let (first, last) = match (resolved.first(), resolved.last()) {
        (Some(first), Some(last)) => (first.id, last.id),
        _ => return None,
    };

    let projected: Vec<Coord<f64>> = resolved.iter()
        .map(|node| projector.project(&MapCoords::new(node.lat, node.lon)))
        .collect();

    stats.before += projected.len();
    let points = simplify(projected, SIMPLIFY_TOLERANCE);
    stats.after += points.len();

    Some(ProjectedPath {
        way_id: way.id,
        points,
        start: first,
        end: last,
    })
}
