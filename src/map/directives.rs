//! Expands a resolved style leaf into concrete draw styles.
//!
//! Symbols and patterns are emitted into the document's definitions once per render. The
//! bookkeeping for that lives in [`RenderContext`], which is created fresh for every render.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::data::semantic::{FeatureType, RenderableFeature};
use crate::errors::{Error, Result};

use super::layers::LayerLayout;
use super::style::{Color, Directive, Leaf};
use super::svg::format_number;

/// Stroke opacity of everything drawn in a tunnel.
pub const TUNNEL_OPACITY: f64 = 0.3;
/// Extra width of a bridge casing over the line it carries.
pub const BRIDGE_CASING_WIDTH: f64 = 0.04;

const DEFAULT_BRIDGE_COLOR: &str = "black";
const BRIDGE_DECK_COLOR: &str = "white";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    Round,
}

impl LineCap {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineCap::Butt => "butt",
            LineCap::Round => "round",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineJoin {
    Round,
}

impl LineJoin {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineJoin::Round => "round",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Paint {
    None,
    Color(Color),
    Pattern(String),
}

impl fmt::Display for Paint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Paint::None => f.write_str("none"),
            Paint::Color(color) => write!(f, "{}", color),
            Paint::Pattern(id) => write!(f, "url(#{})", id),
        }
    }
}

/// Presentation attributes of one drawn element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleAttributes {
    pub fill: Option<Paint>,
    pub fill_opacity: Option<f64>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f64>,
    pub stroke_opacity: Option<f64>,
    pub stroke_linecap: Option<LineCap>,
    pub stroke_linejoin: Option<LineJoin>,
    pub stroke_dasharray: Option<Vec<f64>>,
}

impl StyleAttributes {
    fn stroke(color: &Color, width: f64) -> Self {
        StyleAttributes {
            fill: Some(Paint::None),
            stroke: Some(color.clone()),
            stroke_width: Some(width),
            ..Default::default()
        }
    }

    fn rounded(mut self) -> Self {
        self.stroke_linecap = Some(LineCap::Round);
        self.stroke_linejoin = Some(LineJoin::Round);
        self
    }

    fn fill(paint: Paint) -> Self {
        StyleAttributes {
            fill: Some(paint),
            ..Default::default()
        }
    }

    /// Attribute name/value pairs in output order.
    pub fn to_attributes(&self) -> Vec<(&'static str, String)> {
        let mut attributes = Vec::new();
        if let Some(fill) = &self.fill {
            attributes.push(("fill", fill.to_string()));
        }
        if let Some(opacity) = self.fill_opacity {
            attributes.push(("fill-opacity", format_number(opacity, 3)));
        }
        if let Some(stroke) = &self.stroke {
            attributes.push(("stroke", stroke.to_string()));
        }
        if let Some(width) = self.stroke_width {
            attributes.push(("stroke-width", format_number(width, 3)));
        }
        if let Some(opacity) = self.stroke_opacity {
            attributes.push(("stroke-opacity", format_number(opacity, 3)));
        }
        if let Some(cap) = self.stroke_linecap {
            attributes.push(("stroke-linecap", cap.as_str().to_string()));
        }
        if let Some(join) = self.stroke_linejoin {
            attributes.push(("stroke-linejoin", join.as_str().to_string()));
        }
        if let Some(dash) = &self.stroke_dasharray {
            let dash: Vec<String> = dash.iter().map(|len| format_number(*len, 3)).collect();
            attributes.push(("stroke-dasharray", dash.join(" ")));
        }
        attributes
    }
}

/// Reference to a shape drawn at the feature's first point.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRef {
    pub href: String,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// One way of drawing a feature: a layer plus the attributes to draw it with.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawStyle {
    pub layer_index: usize,
    pub attributes: StyleAttributes,
    pub symbol: Option<SymbolRef>,
}

impl DrawStyle {
    fn new(layer_index: usize, attributes: StyleAttributes) -> Self {
        DrawStyle { layer_index, attributes, symbol: None }
    }
}

/// An entry of the document's definitions section.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Shape {
        id: String,
        markup: String,
    },
    Pattern {
        id: String,
        width: f64,
        height: f64,
        color: Color,
        placements: Vec<(String, f64, f64)>,
    },
    Path {
        id: String,
        d: String,
    },
}

/// Per-render state: which shapes and patterns have been defined already, and the
/// definitions collected so far.
#[derive(Debug, Default)]
pub struct RenderContext {
    shapes: HashSet<String>,
    patterns: HashMap<String, String>,
    definitions: Vec<Definition>,
    next_path: usize,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn into_definitions(self) -> Vec<Definition> {
        self.definitions
    }

    fn shape_id(name: &str) -> String {
        format!("shape-{}", name)
    }

    /// Defines a shape on first use and returns its id.
    pub fn use_shape(&mut self, name: &str, shapes: &HashMap<String, String>) -> Result<String> {
        let id = Self::shape_id(name);
        if !self.shapes.contains(name) {
            let markup = shapes.get(name).ok_or_else(|| Error::UnknownShape(name.to_string()))?;
            self.definitions.push(Definition::Shape {
                id: id.clone(),
                markup: markup.clone(),
            });
            self.shapes.insert(name.to_string());
        }
        Ok(id)
    }

    /// Defines a tiled pattern on first use and returns its id. Identical shape lists, color
    /// and tile size share one pattern.
    pub fn use_pattern(
        &mut self,
        names: &[String],
        color: &Color,
        width: f64,
        height: f64,
        shapes: &HashMap<String, String>,
    ) -> Result<String> {
        let key = format!("{}|{}|{}|{}", names.join(","), color, width, height);
        if let Some(id) = self.patterns.get(&key) {
            return Ok(id.clone());
        }

        let count = names.len().max(1) as f64;
        let mut placements = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            let href = self.use_shape(name, shapes)?;
            let step = idx as f64 + 0.5;
            placements.push((href, step * width / count, step * height / count));
        }

        let id = format!("pattern-{}", self.patterns.len());
        self.definitions.push(Definition::Pattern {
            id: id.clone(),
            width,
            height,
            color: color.clone(),
            placements,
        });
        self.patterns.insert(key, id.clone());
        Ok(id)
    }

    /// Stores a path for reuse and returns its id.
    pub fn define_path(&mut self, d: String) -> String {
        let id = format!("path-{}", self.next_path);
        self.next_path += 1;
        self.definitions.push(Definition::Path { id: id.clone(), d });
        id
    }
}

fn bridge_color(color: &Option<Color>) -> Result<Color> {
    match color {
        Some(color) => Ok(color.clone()),
        None => Color::parse(DEFAULT_BRIDGE_COLOR),
    }
}

fn with_tunnel_opacity(mut styles: Vec<DrawStyle>, is_tunnel: bool) -> Vec<DrawStyle> {
    if is_tunnel {
        for style in &mut styles {
            style.attributes.stroke_opacity = Some(TUNNEL_OPACITY);
        }
    }
    styles
}

/// Turns a leaf into the draw styles of one feature, applying the tunnel/bridge layer shift.
pub fn expand(
    leaf: &Leaf,
    feature: &RenderableFeature,
    layout: &LayerLayout,
    shapes: &HashMap<String, String>,
    context: &mut RenderContext,
) -> Result<Vec<DrawStyle>> {
    let classified = &feature.feature;
    let shift = layout.shift_for(classified);
    let layer = layout.shifted_index(&leaf.layer, shift)?;

    let styles = match &leaf.style {
        Directive::Line(style) => {
            let mut styles = Vec::new();
            if classified.is_bridge {
                let mut casing = StyleAttributes::stroke(&bridge_color(&style.bridge_color)?, style.width + BRIDGE_CASING_WIDTH);
                casing.stroke_linecap = Some(LineCap::Butt);
                styles.push(DrawStyle::new(layer, casing));
            }
            styles.push(DrawStyle::new(layer, StyleAttributes::stroke(&style.color, style.width).rounded()));
            with_tunnel_opacity(styles, classified.is_tunnel)
        },

        Directive::DashedLine(style) => {
            let mut styles = Vec::new();
            if classified.is_bridge {
                let mut casing = StyleAttributes::stroke(&bridge_color(&style.bridge_color)?, style.width + BRIDGE_CASING_WIDTH);
                casing.stroke_linecap = Some(LineCap::Butt);
                styles.push(DrawStyle::new(layer, casing));
                let mut deck = StyleAttributes::stroke(&Color::parse(BRIDGE_DECK_COLOR)?, style.width);
                deck.stroke_linecap = Some(LineCap::Butt);
                styles.push(DrawStyle::new(layer, deck));
            }
            let mut line = StyleAttributes::stroke(&style.color, style.width);
            line.stroke_dasharray = Some(style.dash.clone());
            styles.push(DrawStyle::new(layer, line));
            with_tunnel_opacity(styles, classified.is_tunnel)
        },

        Directive::BorderedLine(style) => {
            let border_layer = layout.shifted_index(style.border_layer.as_deref().unwrap_or(&leaf.layer), shift)?;
            let border_color = if classified.is_bridge {
                bridge_color(&style.bridge_color)?
            } else {
                style.border_color.clone()
            };
            let mut border = StyleAttributes::stroke(&border_color, style.border_width).rounded();
            if classified.is_bridge {
                border.stroke_linecap = Some(LineCap::Butt);
            }
            let styles = vec![
                DrawStyle::new(border_layer, border),
                DrawStyle::new(layer, StyleAttributes::stroke(&style.color, style.width).rounded()),
            ];
            with_tunnel_opacity(styles, classified.is_tunnel)
        },

        Directive::DashedBorderedLine(style) => {
            let border_layer = layout.shifted_index(style.border_layer.as_deref().unwrap_or(&leaf.layer), shift)?;
            let mut styles = vec![DrawStyle::new(border_layer, StyleAttributes::stroke(&style.border_color, style.border_width))];
            let mut dashed = if classified.category.feature_type == Some(FeatureType::Railway) {
                styles.push(DrawStyle::new(layer, StyleAttributes::stroke(&style.color, style.width)));
                StyleAttributes::stroke(&style.border_color, style.width)
            } else {
                StyleAttributes::stroke(&style.color, style.width)
            };
            dashed.stroke_dasharray = Some(style.dash.clone());
            styles.push(DrawStyle::new(layer, dashed));
            with_tunnel_opacity(styles, classified.is_tunnel)
        },

        Directive::Area(style) => {
            let mut fill = StyleAttributes::fill(Paint::Color(style.color.clone()));
            fill.fill_opacity = style.opacity;
            vec![DrawStyle::new(layer, fill)]
        },

        Directive::BorderedArea(style) => {
            let mut area = StyleAttributes::stroke(&style.border_color, style.border_width).rounded();
            area.fill = Some(Paint::Color(style.color.clone()));
            vec![DrawStyle::new(layer, area)]
        },

        Directive::PatternedArea(style) => {
            let pattern = context.use_pattern(&style.shapes, &style.pattern_color, style.tile_width, style.tile_height, shapes)?;
            vec![
                DrawStyle::new(layer, StyleAttributes::fill(Paint::Color(style.color.clone()))),
                DrawStyle::new(layer, StyleAttributes::fill(Paint::Pattern(pattern))),
            ]
        },

        Directive::Symbol(style) => {
            let href = context.use_shape(&style.shape, shapes)?;
            vec![DrawStyle {
                layer_index: layer,
                attributes: StyleAttributes::fill(Paint::Color(style.color.clone())),
                symbol: Some(SymbolRef {
                    href,
                    offset_x: style.offset_x,
                    offset_y: style.offset_y,
                }),
            }]
        },
    };
    Ok(styles)
}
