//! Style configuration and the rule cascade that picks a draw directive for a feature.
//!
//! A style sheet is a tree of rules. Internal rules hold children, leaves hold one directive
//! and the logical layer it is drawn on. Resolution walks down from the root; at each level
//! the last matching child wins, falling back to the last child flagged `isDefault`.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::data::semantic::{FeatureCategory, RenderableFeature};
use crate::errors::{Error, Result};

use super::layers;

const COLOR_PATTERN: &str = r"^(#([0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})|[a-z]+)$";
const SHAPE_NAME_PATTERN: &str = r"^[A-Za-z0-9_-]+$";

static COLOR_REGEX: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
static SHAPE_NAME_REGEX: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

fn compiled(
    cell: &'static OnceLock<std::result::Result<Regex, regex::Error>>,
    pattern: &str,
) -> Result<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|e| Error::InvalidStyle(e.to_string()))
}

const BUILTIN_STYLE: &str = include_str!("../../map-styles/default.json");
const BUILTIN_SHAPES: &str = include_str!("../../map-styles/shapes.json");

/// An SVG paint value: hex notation or a lowercase named color.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Color(String);

impl Color {
    pub fn parse(value: &str) -> Result<Self> {
        if compiled(&COLOR_REGEX, COLOR_PATTERN)?.is_match(value) {
            Ok(Color(value.to_string()))
        } else {
            Err(Error::InvalidStyle(format!("invalid color '{}'", value)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct ColorVisitor;

impl<'de> Visitor<'de> for ColorVisitor {
    type Value = Color;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a color like '#rgb', '#rrggbb', '#rrggbbaa' or a lowercase color name")
    }

    fn visit_str<E>(self, string: &str) -> std::result::Result<Self::Value, E> where E: de::Error {
        Color::parse(string)
            .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(string), &self))
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where D: Deserializer<'de> {
        deserializer.deserialize_str(ColorVisitor)
    }
}

/// Matches a category field against one value or any of several.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Matcher {
    One(String),
    Any(Vec<String>),
}

impl Matcher {
    pub fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else { return false };
        match self {
            Matcher::One(expected) => expected == value,
            Matcher::Any(expected) => expected.iter().any(|e| e == value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicates {
    pub feature_type: Option<Matcher>,
    pub subtype: Option<Matcher>,
    pub service: Option<Matcher>,
    pub surface: Option<Matcher>,
}

impl Predicates {
    fn all(&self) -> impl Iterator<Item = &Matcher> {
        [&self.feature_type, &self.subtype, &self.service, &self.surface]
            .into_iter()
            .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.all().next().is_none()
    }

    /// A rule without predicates never matches; it can only be reached as a default.
    pub fn matches(&self, category: &FeatureCategory) -> bool {
        let checks = [
            (&self.feature_type, category.feature_type.map(|t| t.as_str())),
            (&self.subtype, Some(category.subtype.as_str())),
            (&self.service, category.service.as_deref()),
            (&self.surface, category.surface.as_deref()),
        ];
        !self.is_empty() && checks.into_iter().all(|(matcher, value)| match matcher {
            Some(matcher) => matcher.matches(value),
            None => true,
        })
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LineStyle {
    pub color: Color,
    pub width: f64,
    #[serde(default)]
    pub bridge_color: Option<Color>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DashedLineStyle {
    pub color: Color,
    pub width: f64,
    pub dash: Vec<f64>,
    #[serde(default)]
    pub bridge_color: Option<Color>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BorderedLineStyle {
    pub color: Color,
    pub width: f64,
    pub border_color: Color,
    pub border_width: f64,
    /// Layer of the casing. Defaults to the leaf's own layer.
    #[serde(default)]
    pub border_layer: Option<String>,
    #[serde(default)]
    pub bridge_color: Option<Color>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DashedBorderedLineStyle {
    pub color: Color,
    pub width: f64,
    pub border_color: Color,
    pub border_width: f64,
    pub dash: Vec<f64>,
    #[serde(default)]
    pub border_layer: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AreaStyle {
    pub color: Color,
    #[serde(default)]
    pub opacity: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BorderedAreaStyle {
    pub color: Color,
    pub border_color: Color,
    pub border_width: f64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatternedAreaStyle {
    pub color: Color,
    pub shapes: Vec<String>,
    pub pattern_color: Color,
    pub tile_width: f64,
    pub tile_height: f64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SymbolStyle {
    pub shape: String,
    pub color: Color,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Directive {
    Line(LineStyle),
    DashedLine(DashedLineStyle),
    BorderedLine(BorderedLineStyle),
    DashedBorderedLine(DashedBorderedLineStyle),
    Area(AreaStyle),
    BorderedArea(BorderedAreaStyle),
    PatternedArea(PatternedAreaStyle),
    Symbol(SymbolStyle),
}

impl Directive {
    fn extra_layer(&self) -> Option<&str> {
        match self {
            Directive::BorderedLine(style) => style.border_layer.as_deref(),
            Directive::DashedBorderedLine(style) => style.border_layer.as_deref(),
            _ => None,
        }
    }

    fn shapes(&self) -> Vec<&str> {
        match self {
            Directive::PatternedArea(style) => style.shapes.iter().map(String::as_str).collect(),
            Directive::Symbol(style) => vec![style.shape.as_str()],
            _ => Vec::new(),
        }
    }

    fn lengths(&self) -> Vec<f64> {
        match self {
            Directive::Line(s) => vec![s.width],
            Directive::DashedLine(s) => [vec![s.width], s.dash.clone()].concat(),
            Directive::BorderedLine(s) => vec![s.width, s.border_width],
            Directive::DashedBorderedLine(s) => [vec![s.width, s.border_width], s.dash.clone()].concat(),
            Directive::Area(_) | Directive::Symbol(_) => Vec::new(),
            Directive::BorderedArea(s) => vec![s.border_width],
            Directive::PatternedArea(s) => vec![s.tile_width, s.tile_height],
        }
    }
}

/// End of a cascade: one directive and the layer it is drawn on.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Leaf {
    pub layer: String,
    pub style: Directive,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleBody {
    Children(Vec<StyleRule>),
    Leaf(Leaf),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawRule {
    #[serde(rename = "type")]
    feature_type: Option<Matcher>,
    subtype: Option<Matcher>,
    service: Option<Matcher>,
    surface: Option<Matcher>,
    #[serde(default)]
    is_default: bool,
    children: Option<Vec<StyleRule>>,
    draw: Option<Leaf>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawRule")]
pub struct StyleRule {
    pub predicates: Predicates,
    pub is_default: bool,
    pub body: RuleBody,
}

impl TryFrom<RawRule> for StyleRule {
    type Error = Error;

    fn try_from(raw: RawRule) -> Result<Self> {
        let body = match (raw.children, raw.draw) {
            (Some(children), None) if !children.is_empty() => RuleBody::Children(children),
            (Some(_), None) => return Err(Error::InvalidStyle("rule has an empty child list".into())),
            (None, Some(leaf)) => RuleBody::Leaf(leaf),
            (Some(_), Some(_)) => return Err(Error::InvalidStyle("rule has both children and a draw directive".into())),
            (None, None) => return Err(Error::InvalidStyle("rule has neither children nor a draw directive".into())),
        };
        Ok(StyleRule {
            predicates: Predicates {
                feature_type: raw.feature_type,
                subtype: raw.subtype,
                service: raw.service,
                surface: raw.surface,
            },
            is_default: raw.is_default,
            body,
        })
    }
}

impl StyleRule {
    fn leaves(&self) -> Vec<&Leaf> {
        match &self.body {
            RuleBody::Leaf(leaf) => vec![leaf],
            RuleBody::Children(children) => children.iter().flat_map(StyleRule::leaves).collect(),
        }
    }
}

/// Walks the rule tree for a category. `None` means no leaf applies.
pub fn cascade<'a>(rules: &'a StyleRule, category: &FeatureCategory) -> Option<&'a Leaf> {
    let mut current = rules;
    loop {
        let children = match &current.body {
            RuleBody::Leaf(leaf) => return Some(leaf),
            RuleBody::Children(children) => children,
        };
        let mut matched = None;
        let mut default = None;
        for child in children {
            if child.is_default {
                default = Some(child);
            }
            if child.predicates.matches(category) {
                matched = Some(child);
            }
        }
        current = matched.or(default)?;
    }
}

#[derive(Deserialize)]
struct StyleSheet {
    background: Color,
    rules: StyleRule,
}

/// Everything needed to style a map: the rule tree, the page background and the markup of
/// every shape symbols and patterns may refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    pub background: Color,
    pub rules: StyleRule,
    pub shapes: HashMap<String, String>,
}

impl StyleConfig {
    pub fn from_json(style: &str, shapes: &str) -> Result<Self> {
        let sheet: StyleSheet = serde_json::from_str(style)?;
        let shapes: HashMap<String, String> = serde_json::from_str(shapes)?;
        let config = StyleConfig {
            background: sheet.background,
            rules: sheet.rules,
            shapes,
        };
        config.validate()?;
        Ok(config)
    }

    /// The style shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_STYLE, BUILTIN_SHAPES)
    }

    fn validate(&self) -> Result<()> {
        let shape_name = compiled(&SHAPE_NAME_REGEX, SHAPE_NAME_PATTERN)?;
        if let Some(name) = self.shapes.keys().find(|name| !shape_name.is_match(name)) {
            return Err(Error::InvalidShapeName(name.clone()));
        }

        for leaf in self.rules.leaves() {
            let names = std::iter::once(leaf.layer.as_str()).chain(leaf.style.extra_layer());
            for layer in names {
                if !layers::is_layer_name(layer) {
                    return Err(Error::UnknownLayer(layer.to_string()));
                }
            }
            for shape in leaf.style.shapes() {
                if !self.shapes.contains_key(shape) {
                    return Err(Error::UnknownShape(shape.to_string()));
                }
            }
            if leaf.style.lengths().iter().any(|len| !len.is_finite() || *len <= 0.0) {
                return Err(Error::InvalidStyle(format!("non-positive length in {:?}", leaf.style)));
            }
        }
        Ok(())
    }

    /// Finds the leaf styling a feature. Asking for the style of an undrawn feature is a
    /// caller bug and fails.
    pub fn resolve(&self, feature: &RenderableFeature) -> Result<Option<&Leaf>> {
        if !feature.feature.draw {
            return Err(Error::InvalidStyleInvocation {
                id: feature.id,
                category: feature.feature.category.to_string(),
            });
        }
        Ok(cascade(&self.rules, &feature.feature.category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::osm::ElementKind;
    use crate::data::semantic::{ClassifiedFeature, FeatureType};

    const SHAPES: &str = r##"{ "tree": "<circle r=\"0.05\"/>", "peak": "<path d=\"M0 -0.1L0.1 0.1L-0.1 0.1Z\"/>" }"##;

    const STYLE: &str = r##"{
        "background": "#f2efe9",
        "rules": { "children": [
            { "type": "road", "children": [
                { "isDefault": true, "draw": { "layer": "ROAD-MINOR", "style": { "line": { "color": "white", "width": 0.06 } } } },
                { "subtype": ["primary", "primary_link"], "draw": { "layer": "ROAD-PRIMARY", "style": { "line": { "color": "#fdd7a1", "width": 0.1 } } } },
                { "subtype": "primary", "surface": "gravel", "draw": { "layer": "ROAD-PATH", "style": { "line": { "color": "#ac8327", "width": 0.1 } } } }
            ] },
            { "type": "land", "subtype": "wood", "draw": { "layer": "LAND-LOW", "style": { "patternedArea": {
                "color": "#9dca8a", "shapes": ["tree"], "patternColor": "#6f9e5c", "tileWidth": 0.3, "tileHeight": 0.3 } } } },
            { "type": "poi", "draw": { "layer": "POI", "style": { "symbol": { "shape": "peak", "color": "#d08f55" } } } }
        ] }
    }"##;

    fn feature(feature_type: FeatureType, subtype: &str) -> RenderableFeature {
        RenderableFeature {
            id: 42,
            element: ElementKind::Way,
            feature: ClassifiedFeature {
                draw: true,
                category: FeatureCategory::new(feature_type, subtype),
                ..Default::default()
            },
            is_multi_path: false,
            path: Vec::new(),
            rings: Vec::new(),
        }
    }

    fn layer_of(config: &StyleConfig, feature: &RenderableFeature) -> Option<String> {
        config.resolve(feature).unwrap().map(|leaf| leaf.layer.clone())
    }

    #[test]
    fn parses_directives_and_colors() {
        let config = StyleConfig::from_json(STYLE, SHAPES).unwrap();
        assert_eq!(config.background.as_str(), "#f2efe9");
        let leaf = config.resolve(&feature(FeatureType::Land, "wood")).unwrap().unwrap();
        match &leaf.style {
            Directive::PatternedArea(style) => {
                assert_eq!(style.shapes, vec!["tree".to_string()]);
                assert_eq!(style.tile_width, 0.3);
            },
            other => panic!("unexpected directive {other:?}"),
        }
    }

    #[test]
    fn last_match_wins_and_defaults_apply() {
        let config = StyleConfig::from_json(STYLE, SHAPES).unwrap();
        assert_eq!(layer_of(&config, &feature(FeatureType::Road, "primary")).as_deref(), Some("ROAD-PRIMARY"));
        assert_eq!(layer_of(&config, &feature(FeatureType::Road, "residential")).as_deref(), Some("ROAD-MINOR"));

        let mut gravel = feature(FeatureType::Road, "primary");
        gravel.feature.category.surface = Some("gravel".into());
        assert_eq!(layer_of(&config, &gravel).as_deref(), Some("ROAD-PATH"));
    }

    #[test]
    fn unmatched_features_have_no_style() {
        let config = StyleConfig::from_json(STYLE, SHAPES).unwrap();
        assert_eq!(layer_of(&config, &feature(FeatureType::Railway, "rail")), None);
        assert_eq!(layer_of(&config, &feature(FeatureType::Land, "meadow")), None);
    }

    #[test]
    fn undrawn_features_cannot_be_styled() {
        let config = StyleConfig::from_json(STYLE, SHAPES).unwrap();
        let mut undrawn = feature(FeatureType::Road, "primary");
        undrawn.feature.draw = false;
        match config.resolve(&undrawn) {
            Err(Error::InvalidStyleInvocation { id, category }) => {
                assert_eq!(id, 42);
                assert_eq!(category, "road=primary");
            },
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_configuration() {
        let unknown_layer = STYLE.replace("ROAD-PATH", "ROAD-SKY");
        assert!(matches!(StyleConfig::from_json(&unknown_layer, SHAPES), Err(Error::UnknownLayer(_))));

        assert!(matches!(StyleConfig::from_json(STYLE, r#"{ "tree": "" }"#), Err(Error::UnknownShape(_))));
        assert!(matches!(
            StyleConfig::from_json(STYLE, r#"{ "tree": "", "peak": "", "bad name": "" }"#),
            Err(Error::InvalidShapeName(_))
        ));

        let bad_color = STYLE.replace("#fdd7a1", "#fdd7a");
        assert!(StyleConfig::from_json(&bad_color, SHAPES).is_err());

        let empty_children = r#"{ "background": "white", "rules": { "children": [] } }"#;
        assert!(StyleConfig::from_json(empty_children, SHAPES).is_err());

        let negative = STYLE.replace("0.06", "-0.06");
        assert!(matches!(StyleConfig::from_json(&negative, SHAPES), Err(Error::InvalidStyle(_))));
    }

    #[test]
    fn colors_are_validated() {
        for color in ["#fff", "#f2efe9", "#f2efe980", "black", "none"] {
            assert!(Color::parse(color).is_ok(), "{color}");
        }
        for color in ["", "#ff", "f2efe9", "Black", "#ggg"] {
            assert!(Color::parse(color).is_err(), "{color}");
        }
        let first = compiled(&COLOR_REGEX, COLOR_PATTERN).unwrap();
        let second = compiled(&COLOR_REGEX, COLOR_PATTERN).unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn builtin_style_loads() {
        let config = StyleConfig::builtin().unwrap();
        let motorway = config.resolve(&feature(FeatureType::Road, "motorway")).unwrap().unwrap();
        assert_eq!(motorway.layer, "ROAD-MOTORWAY");
        assert!(matches!(motorway.style, Directive::BorderedLine(_)));
    }
}
