//! Layer compositor: turns styled features into an SVG document.

use log::{debug, info, warn};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::data::semantic::{PathPoint, RenderableFeature};
use crate::errors::Result;

use super::directives::{expand, Definition, RenderContext, StyleAttributes};
use super::layers::LayerLayout;
use super::projection::PageSize;
use super::style::StyleConfig;

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// Geometry is defined once and referenced when a feature is drawn at least this often...
const REUSE_MIN_STYLES: usize = 2;
/// ...and has at least this many points.
const REUSE_MIN_POINTS: usize = 4;

/// Rounds to `digits` decimals and prints without trailing zeros.
pub fn format_number(value: f64, digits: i32) -> String {
    let factor = 10f64.powi(digits);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        // Also turns -0 into 0.
        return "0".to_string();
    }
    format!("{}", rounded)
}

/// SVG path data for a sequence of points, e.g. `M1.5 2L3 4`.
pub fn path_data(points: &[PathPoint]) -> String {
    points.iter()
        .map(|point| format!(
            "{}{} {}",
            point.connection.as_char(),
            format_number(point.x, 2),
            format_number(point.y, 2),
        ))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeometryRef {
    Inline(String),
    Reference(String),
    Symbol {
        href: String,
        x: f64,
        y: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawInstruction {
    pub layer_index: usize,
    pub geometry: GeometryRef,
    pub style: StyleAttributes,
    pub is_multi_path: bool,
}

/// Drawing order within a layer: large areas first, then small areas, short paths, long paths.
/// The sort is stable, so equal keys keep their input order.
pub fn sort_features(features: &[RenderableFeature]) -> Vec<&RenderableFeature> {
    let mut sorted: Vec<&RenderableFeature> = features.iter().collect();
    sorted.sort_by_key(|feature| {
        let sign: i64 = if feature.feature.is_area { -1 } else { 1 };
        sign * feature.path.len() as i64
    });
    sorted
}

/// Resolves every feature's style and buckets the resulting instructions by layer.
pub fn build_layers(
    features: &[RenderableFeature],
    style: &StyleConfig,
    layout: &LayerLayout,
    context: &mut RenderContext,
) -> Result<Vec<Vec<DrawInstruction>>> {
    let mut layers: Vec<Vec<DrawInstruction>> = (0..layout.layer_count()).map(|_| Vec::new()).collect();
    let mut unstyled = 0usize;

    for feature in sort_features(features) {
        let Some(leaf) = style.resolve(feature)? else {
            warn!(id = feature.id, element = feature.element.as_str(), category:% = feature.feature.category; "No style for feature, omitting it");
            unstyled += 1;
            continue;
        };
        let Some(first) = feature.path.first() else {
            debug!(id = feature.id; "Feature has no geometry, omitting it");
            continue;
        };

        let styles = expand(leaf, feature, layout, &style.shapes, context)?;
        let d = path_data(&feature.path);
        let geometry = if !feature.feature.is_point
            && styles.len() >= REUSE_MIN_STYLES
            && feature.path.len() >= REUSE_MIN_POINTS {
            GeometryRef::Reference(context.define_path(d))
        } else {
            GeometryRef::Inline(d)
        };

        for draw_style in styles {
            let geometry = match &draw_style.symbol {
                Some(symbol) => GeometryRef::Symbol {
                    href: symbol.href.clone(),
                    x: first.x + symbol.offset_x,
                    y: first.y + symbol.offset_y,
                },
                None => geometry.clone(),
            };
            layers[draw_style.layer_index].push(DrawInstruction {
                layer_index: draw_style.layer_index,
                geometry,
                style: draw_style.attributes,
                is_multi_path: feature.is_multi_path,
            });
        }
    }

    if unstyled > 0 {
        warn!(count = unstyled; "Some drawable features had no style");
    }
    Ok(layers)
}

fn href(id: &str) -> String {
    format!("#{}", id)
}

fn write_definition<W: std::io::Write>(writer: &mut Writer<W>, definition: &Definition) -> Result<()> {
    match definition {
        Definition::Shape { id, markup } => {
            writer.write_event(Event::Start(BytesStart::new("g").with_attributes([("id", id.as_str())])))?;
            writer.write_event(Event::Text(BytesText::from_escaped(markup.as_str())))?;
            writer.write_event(Event::End(BytesEnd::new("g")))?;
        },
        Definition::Pattern { id, width, height, color, placements } => {
            let pattern = BytesStart::new("pattern").with_attributes([
                ("id", id.as_str()),
                ("width", format_number(*width, 3).as_str()),
                ("height", format_number(*height, 3).as_str()),
                ("patternUnits", "userSpaceOnUse"),
            ]);
            writer.write_event(Event::Start(pattern))?;
            for (shape, x, y) in placements {
                let placement = BytesStart::new("use").with_attributes([
                    ("xlink:href", href(shape).as_str()),
                    ("x", format_number(*x, 3).as_str()),
                    ("y", format_number(*y, 3).as_str()),
                    ("fill", color.as_str()),
                ]);
                writer.write_event(Event::Empty(placement))?;
            }
            writer.write_event(Event::End(BytesEnd::new("pattern")))?;
        },
        Definition::Path { id, d } => {
            let path = BytesStart::new("path").with_attributes([("id", id.as_str()), ("d", d.as_str())]);
            writer.write_event(Event::Empty(path))?;
        },
    }
    Ok(())
}

fn write_instruction<W: std::io::Write>(writer: &mut Writer<W>, instruction: &DrawInstruction) -> Result<()> {
    let mut element = match &instruction.geometry {
        GeometryRef::Inline(d) => BytesStart::new("path").with_attributes([("d", d.as_str())]),
        GeometryRef::Reference(id) => BytesStart::new("use").with_attributes([("xlink:href", href(id).as_str())]),
        GeometryRef::Symbol { href: shape, x, y } => BytesStart::new("use").with_attributes([
            ("xlink:href", href(shape).as_str()),
            ("x", format_number(*x, 2).as_str()),
            ("y", format_number(*y, 2).as_str()),
        ]),
    };
    for (name, value) in instruction.style.to_attributes() {
        element.push_attribute((name, value.as_str()));
    }
    if instruction.is_multi_path {
        element.push_attribute(("fill-rule", "evenodd"));
    }
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

/// Renders features into a complete SVG document sized to the page in centimetres.
pub fn compose(
    features: &[RenderableFeature],
    style: &StyleConfig,
    layout: &LayerLayout,
    page: PageSize,
) -> Result<String> {
    let mut context = RenderContext::new();
    let layers = build_layers(features, style, layout, &mut context)?;
    let definitions = context.into_definitions();

    let width = format_number(page.width, 2);
    let height = format_number(page.height, 2);
    let view_box = format!("0 0 {} {}", width, height);
    let width_cm = format!("{}cm", width);
    let height_cm = format!("{}cm", height);

    let mut writer = Writer::new(Vec::new());
    let svg = BytesStart::new("svg").with_attributes([
        ("version", "1.1"),
        ("viewBox", view_box.as_str()),
        ("width", width_cm.as_str()),
        ("height", height_cm.as_str()),
        ("xmlns", SVG_NAMESPACE),
        ("xmlns:xlink", XLINK_NAMESPACE),
    ]);
    writer.write_event(Event::Start(svg))?;

    if !definitions.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("defs")))?;
        for definition in &definitions {
            write_definition(&mut writer, definition)?;
        }
        writer.write_event(Event::End(BytesEnd::new("defs")))?;
    }

    let background = BytesStart::new("rect").with_attributes([
        ("width", "100%"),
        ("height", "100%"),
        ("fill", style.background.as_str()),
    ]);
    writer.write_event(Event::Empty(background))?;

    let mut drawn = 0usize;
    for instruction in layers.iter().flatten() {
        write_instruction(&mut writer, instruction)?;
        drawn += 1;
    }
    writer.write_event(Event::End(BytesEnd::new("svg")))?;

    info!(instructions = drawn, definitions = definitions.len(); "Composed map document");
    Ok(String::from_utf8(writer.into_inner())?)
}
