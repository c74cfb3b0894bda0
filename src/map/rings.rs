//! Reassembles the member ways of a multipolygon relation into continuous rings.
//!
//! Fragments are kept in an arena addressed by index; a side table maps every endpoint node
//! to the fragment ends touching it. Each unplaced fragment seeds a chain that is extended
//! forward from its open end, then backward from its open start, always taking the first
//! unplaced fragment listed at the current node. At junctions where more than two fragments
//! meet, that makes the result depend on member order.

use std::collections::{HashMap, VecDeque};

use crate::data::osm::OsmId;
use crate::data::semantic::OrientedFragment;

use super::path::ProjectedPath;

/// A member way reduced to its endpoint identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub way_id: OsmId,
    pub start: OsmId,
    pub end: OsmId,
}

impl From<&ProjectedPath> for Fragment {
    fn from(value: &ProjectedPath) -> Self {
        Fragment {
            way_id: value.way_id,
            start: value.start,
            end: value.end,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct EndpointRef {
    index: usize,
    at_start: bool,
}

fn oriented(fragment: &Fragment, reverse: bool) -> OrientedFragment {
    let (start, end) = if reverse {
        (fragment.end, fragment.start)
    } else {
        (fragment.start, fragment.end)
    };
    OrientedFragment {
        way_id: fragment.way_id,
        start,
        end,
        reverse,
    }
}

/// Orders and orients fragments into maximal chains. Every fragment ends up in exactly one
/// chain; fragments that connect to nothing form chains of their own.
pub fn stitch_rings(fragments: &[Fragment]) -> Vec<Vec<OrientedFragment>> {
    let mut endpoints: HashMap<OsmId, Vec<EndpointRef>> = HashMap::new();
    for (index, fragment) in fragments.iter().enumerate() {
        endpoints.entry(fragment.start).or_default().push(EndpointRef { index, at_start: true });
        endpoints.entry(fragment.end).or_default().push(EndpointRef { index, at_start: false });
    }

    let mut placed = vec![false; fragments.len()];
    let next_at = |node: OsmId, placed: &mut Vec<bool>| -> Option<EndpointRef> {
        let candidate = endpoints.get(&node)?
            .iter()
            .find(|end| !placed[end.index])
            .copied()?;
        placed[candidate.index] = true;
        Some(candidate)
    };

    let mut chains = Vec::new();
    for seed in 0..fragments.len() {
        if placed[seed] {
            continue;
        }
        placed[seed] = true;
        let mut chain = VecDeque::from([oriented(&fragments[seed], false)]);

        // Forward: the next fragment must start where the chain ends.
        while let Some(tail) = chain.back().map(|f| f.end) {
            let Some(found) = next_at(tail, &mut placed) else { break };
            chain.push_back(oriented(&fragments[found.index], !found.at_start));
        }

        // Backward: the previous fragment must end where the chain starts.
        while let Some(head) = chain.front().map(|f| f.start) {
            let Some(found) = next_at(head, &mut placed) else { break };
            chain.push_front(oriented(&fragments[found.index], found.at_start));
        }

        chains.push(chain.into());
    }
    chains
}
