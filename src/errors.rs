use std::{io, num::{ParseFloatError, ParseIntError}, string::FromUtf8Error};

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

use crate::data::osm::OsmId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("xml attribute error: {0}")]
    XmlAttribute(#[from] AttrError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid number: {0}")]
    ParseFloat(#[from] ParseFloatError),

    #[error("invalid integer: {0}")]
    ParseInt(#[from] ParseIntError),

    #[error("output is not valid utf-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("invalid bounding box: lower-left ({ll_lat}, {ll_lon}) must lie south-west of upper-right ({ur_lat}, {ur_lon})")]
    InvalidBoundingBox {
        ll_lat: f64,
        ll_lon: f64,
        ur_lat: f64,
        ur_lon: f64,
    },

    #[error("invalid scale denominator: {0}")]
    InvalidScale(f64),

    #[error("invalid style rule: {0}")]
    InvalidStyle(String),

    #[error("style references unknown layer `{0}`")]
    UnknownLayer(String),

    #[error("style references unknown shape `{0}`")]
    UnknownShape(String),

    #[error("invalid shape name `{0}`")]
    InvalidShapeName(String),

    /// Only drawable features may be styled; anything else is a bug in the caller.
    #[error("cannot style feature {id} ({category}): feature is not drawable")]
    InvalidStyleInvocation {
        id: OsmId,
        category: String,
    },

    #[error("cache error: {0}")]
    Cache(String),

    #[error("{0}")]
    Message(String),
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Message(value.to_string())
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Message(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
