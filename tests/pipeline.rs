use map_creator::data::osm::{Element, ElementKind, Member, Node, OsmId, Relation, Tags, Way};
use map_creator::data::semantic::{BoundingBox, FeatureType, MapCoords};
use map_creator::data::OsmData;
use map_creator::map::directives::{expand, RenderContext};
use map_creator::map::layers::LayerLayout;
use map_creator::map::style::{Directive, StyleConfig};
use map_creator::map::{process_osm, render_map, MapSource};

fn bbox() -> BoundingBox {
    BoundingBox::new(MapCoords::new(47.69, 11.74), MapCoords::new(47.70, 11.76))
}

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn node(id: OsmId, lat: f64, lon: f64) -> Element {
    Element::Node(Node { id, lat, lon, tags: Tags::new() })
}

fn way(id: OsmId, nodes: &[OsmId], pairs: &[(&str, &str)]) -> Element {
    Element::Way(Way { id, nodes: nodes.to_vec(), tags: tags(pairs) })
}

fn multipolygon(id: OsmId, ways: &[(OsmId, &str)], pairs: &[(&str, &str)]) -> Element {
    let mut relation_tags = tags(pairs);
    relation_tags.insert("type".into(), "multipolygon".into());
    Element::Relation(Relation {
        id,
        members: ways.iter()
            .map(|(way_id, role)| Member { kind: ElementKind::Way, id: *way_id, role: role.to_string() })
            .collect(),
        tags: relation_tags,
    })
}

/// A square of four nodes inside the box, ids `base + 1..=base + 4`.
fn square(base: OsmId, south: f64, west: f64, size: f64) -> Vec<Element> {
    vec![
        node(base + 1, south, west),
        node(base + 2, south, west + size),
        node(base + 3, south + size, west + size),
        node(base + 4, south + size, west),
    ]
}

#[test]
fn motorway_becomes_a_bordered_road() {
    let data = OsmData::new(vec![
        node(1, 47.692, 11.742),
        node(2, 47.695, 11.75),
        node(3, 47.698, 11.758),
        way(10, &[1, 2, 3], &[("highway", "motorway")]),
    ]);
    let processed = process_osm(&data, &bbox(), 25000.0).unwrap();

    assert_eq!(processed.features.len(), 1);
    let motorway = &processed.features[0];
    assert!(motorway.feature.is_way);
    assert_eq!(motorway.feature.category.feature_type, Some(FeatureType::Road));
    assert_eq!(motorway.feature.category.subtype, "motorway");

    let style = StyleConfig::builtin().unwrap();
    let leaf = style.resolve(motorway).unwrap().unwrap();
    assert_eq!(leaf.layer, "ROAD-MOTORWAY");
    assert!(matches!(leaf.style, Directive::BorderedLine(_)));

    let rendered = render_map(MapSource::Processed(processed), &bbox(), 25000.0, &style).unwrap();
    assert!(rendered.svg.contains(r##"stroke="#df2e6b""##));
    assert!(rendered.svg.contains(r##"stroke="#e990a0""##));
}

#[test]
fn chained_water_ways_form_a_single_ring() {
    let mut elements = square(0, 47.692, 11.745, 0.004);
    elements.push(way(10, &[1, 2, 3], &[]));
    elements.push(way(11, &[1, 4, 3], &[]));
    elements.push(multipolygon(100, &[(10, "outer"), (11, "outer")], &[("natural", "water")]));

    let processed = process_osm(&OsmData::new(elements), &bbox(), 25000.0).unwrap();
    assert_eq!(processed.features.len(), 1);
    let lake = &processed.features[0];
    assert_eq!(lake.element, ElementKind::Relation);
    assert!(!lake.is_multi_path);
    assert_eq!(lake.feature.category.feature_type, Some(FeatureType::Water));
    assert_eq!(lake.rings.len(), 1);
    // Way 11 runs the other way round and has to be reversed.
    assert_eq!(lake.rings[0].iter().map(|f| f.reverse).collect::<Vec<_>>(), vec![false, true]);
}

#[test]
fn separate_rings_are_filled_even_odd() {
    let mut elements = square(0, 47.691, 11.743, 0.008);
    elements.extend(square(10, 47.694, 11.746, 0.002));
    elements.push(way(20, &[1, 2, 3, 4, 1], &[]));
    elements.push(way(21, &[11, 12, 13, 14, 11], &[]));
    elements.push(multipolygon(100, &[(20, "outer"), (21, "inner")], &[("natural", "water")]));

    let data = OsmData::new(elements);
    let processed = process_osm(&data, &bbox(), 25000.0).unwrap();
    assert_eq!(processed.features.len(), 1);
    let lake = &processed.features[0];
    assert!(lake.is_multi_path);
    assert_eq!(lake.rings.len(), 2);

    let rendered = render_map(MapSource::Raw(&data), &bbox(), 25000.0, &StyleConfig::builtin().unwrap()).unwrap();
    assert!(rendered.svg.contains(r#"fill-rule="evenodd""#));
    assert_eq!(rendered.svg.matches(r##"fill="#abd4e0""##).count(), 1);
}

#[test]
fn tunnels_drop_by_the_band_offset() {
    let data = OsmData::new(vec![
        node(1, 47.692, 11.742),
        node(2, 47.698, 11.758),
        way(10, &[1, 2], &[("highway", "residential"), ("tunnel", "yes")]),
    ]);
    let processed = process_osm(&data, &bbox(), 25000.0).unwrap();
    let tunnel = &processed.features[0];
    assert!(tunnel.feature.is_tunnel);

    let style = StyleConfig::builtin().unwrap();
    let layout = LayerLayout::new(25000.0);
    let leaf = style.resolve(tunnel).unwrap().unwrap();
    assert_eq!(leaf.layer, "ROAD-MINOR");

    let styles = expand(leaf, tunnel, &layout, &style.shapes, &mut RenderContext::new()).unwrap();
    let offset = layout.tunnel_bridge_offset();
    let layers: Vec<usize> = styles.iter().map(|s| s.layer_index).collect();
    assert_eq!(layers, vec![
        layout.index_of("ROAD-BG-MINOR").unwrap() - offset,
        layout.index_of("ROAD-MINOR").unwrap() - offset,
    ]);
}

#[test]
fn scale_only_moves_buildings_and_resizes_the_page() {
    let mut elements = square(0, 47.693, 11.744, 0.002);
    elements.push(way(10, &[1, 2, 3, 4, 1], &[("building", "yes")]));
    elements.push(node(20, 47.692, 11.742));
    elements.push(node(21, 47.698, 11.758));
    elements.push(way(11, &[20, 21], &[("highway", "primary")]));
    let data = OsmData::new(elements);
    let style = StyleConfig::builtin().unwrap();

    let large = render_map(MapSource::Raw(&data), &bbox(), 3000.0, &style).unwrap();
    let small = render_map(MapSource::Raw(&data), &bbox(), 25000.0, &style).unwrap();

    assert_eq!(large.processed.features.len(), small.processed.features.len());
    for (a, b) in large.processed.features.iter().zip(&small.processed.features) {
        assert_eq!(a.feature, b.feature);
        assert_eq!(a.path.len(), b.path.len());
        for (p, q) in a.path.iter().zip(&b.path) {
            assert!((p.x / large.page.width - q.x / small.page.width).abs() < 1e-9);
            assert!((p.y / large.page.height - q.y / small.page.height).abs() < 1e-9);
        }
    }
    assert!((large.page.width / small.page.width - 25000.0 / 3000.0).abs() < 1e-9);

    let zoomed_in = LayerLayout::new(3000.0);
    let zoomed_out = LayerLayout::new(25000.0);
    assert!(zoomed_in.index_of("BUILDING").unwrap() > zoomed_in.index_of("ROAD-MOTORWAY").unwrap());
    assert!(zoomed_out.index_of("BUILDING").unwrap() < zoomed_out.index_of("ROAD-BG-PATH").unwrap());

    // Buildings are drawn after the roads only on the zoomed-in map.
    let building = |svg: &str| svg.find(r##"fill="#d9d0c9""##).unwrap();
    let road = |svg: &str| svg.find(r##"stroke="#fdd7a1""##).unwrap();
    assert!(building(&large.svg) > road(&large.svg));
    assert!(building(&small.svg) < road(&small.svg));
}

#[test]
fn empty_input_renders_a_background_only() {
    let rendered = render_map(MapSource::Raw(&OsmData::default()), &bbox(), 25000.0, &StyleConfig::builtin().unwrap()).unwrap();
    assert!(rendered.processed.features.is_empty());
    assert!(!rendered.svg.contains("<defs>"));
    assert!(rendered.svg.contains(r##"<rect width="100%" height="100%" fill="#f2efe9"/>"##));
}
