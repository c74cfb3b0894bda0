//! The map pipeline: classification, geometry, styling and composition.

pub mod boundary;
pub mod classify;
pub mod directives;
pub mod layers;
pub mod path;
pub mod process;
pub mod projection;
pub mod rings;
pub mod style;
pub mod svg;

use crate::data::semantic::{BoundingBox, ProcessedData};
use crate::data::OsmData;
use crate::errors::Result;

use self::layers::LayerLayout;
use self::projection::{PageSize, Projector};
use self::style::StyleConfig;

/// Input of a render: raw data, or features processed earlier for the same bounding box and
/// scale.
pub enum MapSource<'a> {
    Raw(&'a OsmData),
    Processed(ProcessedData),
}

pub struct RenderedMap {
    pub processed: ProcessedData,
    pub page: PageSize,
    pub svg: String,
}

/// Classifies and projects raw data for a bounding box and scale.
pub fn process_osm(data: &OsmData, bbox: &BoundingBox, scale: f64) -> Result<ProcessedData> {
    let projector = Projector::new(bbox, scale)?;
    Ok(process::process_map(data, &projector))
}

/// Renders a map document. Processed input skips classification and geometry entirely.
pub fn render_map(source: MapSource, bbox: &BoundingBox, scale: f64, style: &StyleConfig) -> Result<RenderedMap> {
    let projector = Projector::new(bbox, scale)?;
    let processed = match source {
        MapSource::Raw(data) => process::process_map(data, &projector),
        MapSource::Processed(processed) => processed,
    };
    let layout = LayerLayout::new(scale);
    let svg = svg::compose(&processed.features, style, &layout, projector.page())?;
    Ok(RenderedMap {
        processed,
        page: projector.page(),
        svg,
    })
}
