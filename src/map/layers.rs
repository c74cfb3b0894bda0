//! Scale-dependent z-order of the logical layers.
//!
//! Everything from `WATER-LOW` upward forms the tunnel/bridge band. The band is laid out once
//! and then moved up by its own size, leaving a copy's worth of room below it for tunnels and
//! another above it for bridges. `LAND-LOW` and `LAND` stay at the bottom, `POI` sits on top.

use crate::data::semantic::ClassifiedFeature;
use crate::errors::{Error, Result};

/// Buildings are drawn below the roads when the map is zoomed out further than this.
pub const BUILDING_SCALE_THRESHOLD: f64 = 5000.0;

pub const BUILDING: &str = "BUILDING";
pub const POI: &str = "POI";

const GROUND_LAYERS: &[&str] = &["LAND-LOW", "LAND"];
const WATER_AND_MINOR_RAIL: &[&str] = &["WATER-LOW", "WATER", "RAIL-MINOR-BG", "RAIL-MINOR"];
const ROADS: &[&str] = &[
    "ROAD-BG-PATH", "ROAD-BG-MINOR", "ROAD-BG-TERTIARY", "ROAD-BG-SECONDARY",
    "ROAD-BG-PRIMARY", "ROAD-BG-TRUNK", "ROAD-BG-MOTORWAY",
    "ROAD-PATH", "ROAD-MINOR", "ROAD-TERTIARY", "ROAD-SECONDARY",
    "ROAD-PRIMARY", "ROAD-TRUNK", "ROAD-MOTORWAY",
];
const RAIL: &[&str] = &["RAIL-BG", "RAIL"];

/// Every logical layer name a style may refer to.
pub const LAYER_NAMES: &[&str] = &[
    "LAND-LOW", "LAND", "WATER-LOW", "WATER", "RAIL-MINOR-BG", "RAIL-MINOR", BUILDING,
    "ROAD-BG-PATH", "ROAD-BG-MINOR", "ROAD-BG-TERTIARY", "ROAD-BG-SECONDARY",
    "ROAD-BG-PRIMARY", "ROAD-BG-TRUNK", "ROAD-BG-MOTORWAY",
    "ROAD-PATH", "ROAD-MINOR", "ROAD-TERTIARY", "ROAD-SECONDARY",
    "ROAD-PRIMARY", "ROAD-TRUNK", "ROAD-MOTORWAY",
    "RAIL-BG", "RAIL", POI,
];

pub fn is_layer_name(name: &str) -> bool {
    LAYER_NAMES.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerLayout {
    indices: Vec<(&'static str, usize)>,
    offset: usize,
    count: usize,
}

impl LayerLayout {
    pub fn new(scale: f64) -> Self {
        let mut band: Vec<&'static str> = WATER_AND_MINOR_RAIL.to_vec();
        if scale > BUILDING_SCALE_THRESHOLD {
            band.push(BUILDING);
        }
        band.extend_from_slice(ROADS);
        band.extend_from_slice(RAIL);
        if scale <= BUILDING_SCALE_THRESHOLD {
            band.push(BUILDING);
        }

        let band_start = GROUND_LAYERS.len();
        let offset = band.len();
        let mut indices: Vec<(&'static str, usize)> = GROUND_LAYERS.iter()
            .enumerate()
            .map(|(idx, name)| (*name, idx))
            .collect();
        indices.extend(band.iter()
            .enumerate()
            .map(|(idx, name)| (*name, band_start + idx + offset)));

        let poi = band_start + 3 * offset;
        indices.push((POI, poi));

        LayerLayout {
            indices,
            offset,
            count: poi + 1,
        }
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.indices.iter()
            .find(|(layer, _)| *layer == name)
            .map(|(_, idx)| *idx)
            .ok_or_else(|| Error::UnknownLayer(name.to_string()))
    }

    /// Index of a layer moved by `shift`, clamped into the valid range.
    pub fn shifted_index(&self, name: &str, shift: i64) -> Result<usize> {
        let base = self.index_of(name)? as i64;
        let max = self.count as i64 - 1;
        Ok((base + shift).clamp(0, max) as usize)
    }

    /// Layer shift for a feature: down for tunnels, up for bridges.
    pub fn shift_for(&self, feature: &ClassifiedFeature) -> i64 {
        if feature.is_tunnel {
            -(self.offset as i64)
        } else if feature.is_bridge {
            self.offset as i64
        } else {
            0
        }
    }

    pub fn tunnel_bridge_offset(&self) -> usize {
        self.offset
    }

    pub fn layer_count(&self) -> usize {
        self.count
    }

    /// Index of the lowest road foreground layer.
    pub fn road_foreground_base(&self) -> usize {
        self.index_of("ROAD-PATH").unwrap_or_default()
    }
}
