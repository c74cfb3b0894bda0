//! Turns stitched rings into one drawable path.
//!
//! Ways delivered for a bounding box stop somewhere outside the page. When a continuous
//! section begins just past one edge and ends just past an adjacent edge, filling it would
//! close it with a diagonal cut across the page corner. A synthetic point slightly beyond
//! that corner is inserted so the section closes around the corner instead.

use std::collections::HashMap;

use geo::Coord;

use crate::data::osm::OsmId;
use crate::data::semantic::{Connector, OrientedFragment, PathPoint};

use super::path::ProjectedPath;
use super::projection::PageSize;

/// Distance (output units) the synthetic corner point is pushed past the page corner.
pub const CORNER_MARGIN: f64 = 1.0;

/// Which side of the page a point lies on, per axis: -1 before, 0 within, 1 after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Side {
    h: i8,
    v: i8,
}

impl Side {
    fn of(point: Coord<f64>, page: &PageSize) -> Self {
        let axis = |value: f64, max: f64| {
            if value < 0.0 {
                -1
            } else if value > max {
                1
            } else {
                0
            }
        };
        Side {
            h: axis(point.x, page.width),
            v: axis(point.y, page.height),
        }
    }

    /// Outside the page across exactly one edge.
    fn is_single_axis(&self) -> bool {
        (self.h != 0) != (self.v != 0)
    }
}

/// Corner point needed to close a section running from `first` to `last`, if any. Both points
/// must be off the page across exactly one edge each, and those edges must be adjacent.
pub fn corner_for(first: Coord<f64>, last: Coord<f64>, page: &PageSize) -> Option<Coord<f64>> {
    let first_side = Side::of(first, page);
    let last_side = Side::of(last, page);
    if !first_side.is_single_axis() || !last_side.is_single_axis() {
        return None;
    }
    if (first_side.h != 0) == (last_side.h != 0) {
        return None;
    }

    let h = if first_side.h == 0 { last_side.h } else { first_side.h };
    let v = if first_side.v == 0 { last_side.v } else { first_side.v };
    Some(Coord {
        x: if h == 1 { page.width + CORNER_MARGIN } else { -CORNER_MARGIN },
        y: if v == 1 { page.height + CORNER_MARGIN } else { -CORNER_MARGIN },
    })
}

/// Collects sections of fragments that continue each other seamlessly.
fn sections(
    rings: &[Vec<OrientedFragment>],
    paths: &HashMap<OsmId, ProjectedPath>,
) -> Vec<Vec<Coord<f64>>> {
    let mut sections: Vec<Vec<Coord<f64>>> = Vec::new();
    let mut previous_end: Option<OsmId> = None;

    for fragment in rings.iter().flatten() {
        let Some(path) = paths.get(&fragment.way_id) else { continue };
        let points = path.oriented(fragment.reverse);

        match sections.last_mut() {
            Some(section) if previous_end == Some(fragment.start) => {
                // The shared node is already the section's last point.
                let skip = usize::from(section.last() == points.first());
                section.extend(points.into_iter().skip(skip));
            },
            _ => sections.push(points),
        }
        previous_end = Some(fragment.end);
    }
    sections
}

/// Flattens rings into a single move/line path, closing sections around page corners where
/// needed. Sections that stay on the page come out unchanged.
pub fn assemble_rings(
    rings: &[Vec<OrientedFragment>],
    paths: &HashMap<OsmId, ProjectedPath>,
    page: &PageSize,
) -> Vec<PathPoint> {
    let mut output = Vec::new();
    for section in sections(rings, paths) {
        let (Some(&first), Some(&last)) = (section.first(), section.last()) else { continue };
        for (idx, point) in section.iter().enumerate() {
            let connection = if idx == 0 { Connector::Move } else { Connector::Line };
            output.push(PathPoint::new(point.x, point.y, connection));
        }
        if let Some(corner) = corner_for(first, last, page) {
            output.push(PathPoint::new(corner.x, corner.y, Connector::Line));
            output.push(PathPoint::new(first.x, first.y, Connector::Line));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: PageSize = PageSize { width: 10.0, height: 8.0 };

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn path(way_id: OsmId, start: OsmId, end: OsmId, points: &[(f64, f64)]) -> ProjectedPath {
        ProjectedPath {
            way_id,
            points: points.iter().map(|&(x, y)| c(x, y)).collect(),
            start,
            end,
        }
    }

    fn fragment(way_id: OsmId, start: OsmId, end: OsmId, reverse: bool) -> OrientedFragment {
        OrientedFragment { way_id, start, end, reverse }
    }

    #[test]
    fn adjacent_edges_get_a_corner() {
        // Leaves across the top edge, comes back across the left edge.
        let corner = corner_for(c(3.0, -2.0), c(-1.5, 4.0), &PAGE);
        assert_eq!(corner, Some(c(-CORNER_MARGIN, -CORNER_MARGIN)));

        let corner = corner_for(c(12.0, 5.0), c(4.0, 9.0), &PAGE);
        assert_eq!(corner, Some(c(10.0 + CORNER_MARGIN, 8.0 + CORNER_MARGIN)));
    }

    #[test]
    fn same_edge_or_diagonal_needs_no_corner() {
        assert_eq!(corner_for(c(3.0, -2.0), c(6.0, -1.0), &PAGE), None);
        assert_eq!(corner_for(c(-1.0, 3.0), c(11.0, 3.0), &PAGE), None);
        assert_eq!(corner_for(c(-1.0, -1.0), c(3.0, -2.0), &PAGE), None);
        assert_eq!(corner_for(c(1.0, 1.0), c(3.0, -2.0), &PAGE), None);
    }

    #[test]
    fn rings_inside_the_page_are_untouched() {
        let paths = HashMap::from([
            (1, path(1, 10, 20, &[(1.0, 1.0), (5.0, 1.0)])),
            (2, path(2, 30, 20, &[(5.0, 5.0), (5.0, 1.0)])),
            (3, path(3, 30, 10, &[(5.0, 5.0), (1.0, 1.0)])),
        ]);
        let rings = vec![vec![
            fragment(1, 10, 20, false),
            fragment(2, 20, 30, true),
            fragment(3, 30, 10, false),
        ]];
        let assembled = assemble_rings(&rings, &paths, &PAGE);
        let coords: Vec<(f64, f64, Connector)> = assembled.iter().map(|p| (p.x, p.y, p.connection)).collect();
        assert_eq!(coords, vec![
            (1.0, 1.0, Connector::Move),
            (5.0, 1.0, Connector::Line),
            (5.0, 5.0, Connector::Line),
            (1.0, 1.0, Connector::Line),
        ]);
    }

    #[test]
    fn separate_rings_start_with_moves() {
        let paths = HashMap::from([
            (1, path(1, 10, 10, &[(0.0, 0.0), (9.0, 0.0), (9.0, 7.0), (0.0, 0.0)])),
            (2, path(2, 50, 50, &[(2.0, 2.0), (3.0, 2.0), (2.0, 2.0)])),
        ]);
        let rings = vec![vec![fragment(1, 10, 10, false)], vec![fragment(2, 50, 50, false)]];
        let assembled = assemble_rings(&rings, &paths, &PAGE);
        let moves = assembled.iter().filter(|p| p.connection == Connector::Move).count();
        assert_eq!(moves, 2);
        assert_eq!(assembled.len(), 7);
        assert_eq!(assembled[4].connection, Connector::Move);
    }

    #[test]
    fn open_section_crossing_a_corner_is_closed_around_it() {
        let paths = HashMap::from([
            (1, path(1, 10, 20, &[(3.0, -2.0), (3.0, 3.0)])),
            (2, path(2, 20, 30, &[(3.0, 3.0), (-1.5, 4.0)])),
        ]);
        let rings = vec![vec![fragment(1, 10, 20, false), fragment(2, 20, 30, false)]];
        let assembled = assemble_rings(&rings, &paths, &PAGE);
        let tail: Vec<(f64, f64)> = assembled.iter().rev().take(2).map(|p| (p.x, p.y)).collect();
        assert_eq!(tail, vec![(3.0, -2.0), (-CORNER_MARGIN, -CORNER_MARGIN)]);
        assert_eq!(assembled.len(), 5);
    }
}
