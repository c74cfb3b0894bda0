//! Readers for raw map data: OSM XML and Overpass JSON, either optionally xz compressed.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Deserialize;
use xz::bufread::XzDecoder;

use map_creator::data::osm::{Element, ElementKind, Member, Node, Relation, Tags, Way};
use map_creator::data::OsmData;
use map_creator::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Xml,
    Json,
}

impl InputFormat {
    /// Guesses the format from the file name, looking past a trailing `.xz`.
    pub fn from_path(path: &Path) -> InputFormat {
        let name = path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .trim_end_matches(".xz");
        if name.ends_with(".json") {
            InputFormat::Json
        } else {
            InputFormat::Xml
        }
    }
}

fn is_compressed(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "xz")
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file_reader = BufReader::new(fs::File::open(path)?);
    if is_compressed(path) {
        Ok(Box::new(BufReader::new(XzDecoder::new(file_reader))))
    } else {
        Ok(Box::new(file_reader))
    }
}

/// Reads a raw data file in whichever format its name indicates.
pub fn read_osm_file(path: &Path) -> Result<OsmData> {
    let reader = open_input(path)?;
    let data = match InputFormat::from_path(path) {
        InputFormat::Json => parse_overpass_json(reader)?,
        InputFormat::Xml => parse_osm_xml(reader)?,
    };
    info!(path:% = path.display(), elements = data.elements.len(); "Read raw map data");
    Ok(data)
}

#[derive(Deserialize)]
struct Osm3s {
    timestamp_osm_base: Option<String>,
}

#[derive(Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    osm3s: Option<Osm3s>,
    elements: Vec<Element>,
}

pub fn parse_overpass_json<R: BufRead>(reader: R) -> Result<OsmData> {
    let response: OverpassResponse = serde_json::from_reader(reader)?;
    Ok(OsmData {
        elements: response.elements,
        source_timestamp: response.osm3s.and_then(|meta| meta.timestamp_osm_base),
    })
}

fn attribute_map(el: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attributes = HashMap::new();
    for attribute in el.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8(attribute.key.as_ref().to_vec())?;
        let value = attribute.unescape_value()?.into_owned();
        attributes.insert(key, value);
    }
    Ok(attributes)
}

fn required<'a>(attributes: &'a HashMap<String, String>, key: &str, element: &str) -> Result<&'a str> {
    attributes.get(key)
        .map(String::as_str)
        .ok_or_else(|| Error::Message(format!("<{}> without '{}' attribute", element, key)))
}

fn member_kind(value: &str) -> Result<ElementKind> {
    match value {
        "node" => Ok(ElementKind::Node),
        "way" => Ok(ElementKind::Way),
        "relation" => Ok(ElementKind::Relation),
        other => Err(Error::Message(format!("unknown member type '{}'", other))),
    }
}

fn start_element(name: &[u8], el: &BytesStart) -> Result<Option<Element>> {
    let attributes = attribute_map(el)?;
    let element = match name {
        b"node" => Element::Node(Node {
            id: required(&attributes, "id", "node")?.parse()?,
            lat: required(&attributes, "lat", "node")?.parse()?,
            lon: required(&attributes, "lon", "node")?.parse()?,
            tags: Tags::new(),
        }),
        b"way" => Element::Way(Way {
            id: required(&attributes, "id", "way")?.parse()?,
            nodes: Vec::new(),
            tags: Tags::new(),
        }),
        b"relation" => Element::Relation(Relation {
            id: required(&attributes, "id", "relation")?.parse()?,
            members: Vec::new(),
            tags: Tags::new(),
        }),
        _ => return Ok(None),
    };
    Ok(Some(element))
}

/// Adds a child (`nd`, `tag` or `member`) to the element being read.
fn add_child(current: &mut Element, name: &[u8], el: &BytesStart) -> Result<()> {
    let attributes = attribute_map(el)?;
    match (name, current) {
        (b"tag", element) => {
            let key = required(&attributes, "k", "tag")?.to_string();
            let value = required(&attributes, "v", "tag")?.to_string();
            match element {
                Element::Node(node) => node.tags.insert(key, value),
                Element::Way(way) => way.tags.insert(key, value),
                Element::Relation(relation) => relation.tags.insert(key, value),
            };
        },
        (b"nd", Element::Way(way)) => way.nodes.push(required(&attributes, "ref", "nd")?.parse()?),
        (b"member", Element::Relation(relation)) => relation.members.push(Member {
            kind: member_kind(required(&attributes, "type", "member")?)?,
            id: required(&attributes, "ref", "member")?.parse()?,
            role: attributes.get("role").cloned().unwrap_or_default(),
        }),
        (other, element) => {
            warn!(child:% = String::from_utf8_lossy(other), parent = element.id(); "Ignoring unexpected child element");
        },
    }
    Ok(())
}

/// Reads an `<osm>` document as written by the OSM API and Overpass.
pub fn parse_osm_xml<R: BufRead>(reader: R) -> Result<OsmData> {
    let mut reader = Reader::from_reader(reader);
    reader.trim_text(true);
    let mut buf = Vec::new();

    let mut data = OsmData::default();
    let mut current: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = e.name();
                match current.as_mut() {
                    Some(element) => add_child(element, name.as_ref(), &e)?,
                    None => current = start_element(name.as_ref(), &e)?,
                }
            },
            Event::Empty(e) => {
                let name = e.name();
                match (current.as_mut(), name.as_ref()) {
                    (Some(element), child) => add_child(element, child, &e)?,
                    (None, b"meta") => {
                        data.source_timestamp = attribute_map(&e)?.remove("osm_base");
                    },
                    (None, element) => {
                        if let Some(element) = start_element(element, &e)? {
                            data.elements.push(element);
                        }
                    },
                }
            },
            Event::End(e) => {
                if matches!(e.name().as_ref(), b"node" | b"way" | b"relation") {
                    if let Some(element) = current.take() {
                        data.elements.push(element);
                    }
                }
            },
            // Declarations, comments and the <note> text carry nothing we need.
            _ => (),
        }
        buf.clear();
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="Overpass API">
  <note>The data included in this document is from www.openstreetmap.org.</note>
  <meta osm_base="2024-05-01T12:00:00Z"/>
  <node id="1" lat="47.692" lon="11.742"/>
  <node id="2" lat="47.698" lon="11.758">
    <tag k="natural" v="peak"/>
    <tag k="name" v="Gipfel &amp; Kreuz"/>
  </node>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="highway" v="track"/>
  </way>
  <relation id="100">
    <member type="way" ref="10" role="outer"/>
    <tag k="type" v="multipolygon"/>
  </relation>
</osm>"#;

    #[test]
    fn reads_osm_xml() {
        let data = parse_osm_xml(XML.as_bytes()).unwrap();
        assert_eq!(data.source_timestamp.as_deref(), Some("2024-05-01T12:00:00Z"));
        assert_eq!(data.elements.len(), 4);

        let ids: Vec<i64> = data.elements.iter().map(Element::id).collect();
        assert_eq!(ids, vec![1, 2, 10, 100]);
        assert_eq!(data.elements[1].tag("name"), Some("Gipfel & Kreuz"));

        match &data.elements[2] {
            Element::Way(way) => {
                assert_eq!(way.nodes, vec![1, 2]);
                assert_eq!(way.tags.get("highway").map(String::as_str), Some("track"));
            },
            other => panic!("expected a way, got {other:?}"),
        }
        match &data.elements[3] {
            Element::Relation(relation) => {
                assert_eq!(relation.members, vec![Member { kind: ElementKind::Way, id: 10, role: "outer".into() }]);
            },
            other => panic!("expected a relation, got {other:?}"),
        }
    }

    #[test]
    fn rejects_nodes_without_coordinates() {
        let xml = r#"<osm><node id="1" lat="47.0"/></osm>"#;
        assert!(parse_osm_xml(xml.as_bytes()).is_err());
        let xml = r#"<osm><node id="x" lat="47.0" lon="11.0"/></osm>"#;
        assert!(matches!(parse_osm_xml(xml.as_bytes()), Err(Error::ParseInt(_))));
    }

    #[test]
    fn reads_overpass_json() {
        let json = r#"{
            "version": 0.6,
            "osm3s": { "timestamp_osm_base": "2024-05-01T12:00:00Z", "copyright": "ODbL" },
            "elements": [
                { "type": "node", "id": 1, "lat": 47.692, "lon": 11.742 },
                { "type": "way", "id": 10, "nodes": [1, 2], "tags": { "highway": "primary" } },
                { "type": "relation", "id": 100, "members": [ { "type": "way", "ref": 10, "role": "outer" } ],
                  "tags": { "type": "multipolygon", "natural": "water" } }
            ]
        }"#;
        let data = parse_overpass_json(json.as_bytes()).unwrap();
        assert_eq!(data.source_timestamp.as_deref(), Some("2024-05-01T12:00:00Z"));
        assert_eq!(data.elements.len(), 3);
        assert_eq!(data.elements[1].tag("highway"), Some("primary"));
        assert_eq!(data.elements[2].kind(), ElementKind::Relation);
    }

    #[test]
    fn format_follows_file_name() {
        assert_eq!(InputFormat::from_path(Path::new("data/area.json")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("data/area.json.xz")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("data/area.osm.xz")), InputFormat::Xml);
        assert!(is_compressed(Path::new("data/area.osm.xz")));
        assert!(!is_compressed(Path::new("data/area.osm")));
    }
}
