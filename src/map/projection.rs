use geo::{Coord, Distance, Haversine, Point};

use crate::data::semantic::{BoundingBox, MapCoords};
use crate::errors::{Error, Result};

/// Output length units (centimetres) per metre on the ground.
pub const UNITS_PER_METER: f64 = 100.0;

const MAX_LATITUDE: f64 = 85.05112878;

/// Size of the printed page in output units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn contains(&self, point: Coord<f64>) -> bool {
        (0.0..=self.width).contains(&point.x) && (0.0..=self.height).contains(&point.y)
    }
}

/// Projects geographic coordinates onto a page sized for a given scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    page: PageSize,
}

/// Spherical web mercator with y growing southward, on a unit world.
fn web_mercator(coords: &MapCoords) -> Coord<f64> {
    let lat = coords.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = coords.lon / 360.0 + 0.5;
    let y = 0.5 - (lat.tan() + 1.0 / lat.cos()).ln() / (2.0 * std::f64::consts::PI);
    Coord { x, y }
}

fn ground_distance(a: &MapCoords, b: &MapCoords) -> f64 {
    Haversine.distance(Point::new(a.lon, a.lat), Point::new(b.lon, b.lat))
}

impl Projector {
    pub fn new(bbox: &BoundingBox, scale: f64) -> Result<Self> {
        if !bbox.is_valid() {
            return Err(Error::InvalidBoundingBox {
                ll_lat: bbox.ll.lat,
                ll_lon: bbox.ll.lon,
                ur_lat: bbox.ur.lat,
                ur_lon: bbox.ur.lon,
            });
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::InvalidScale(scale));
        }

        let corners = [
            bbox.ll,
            MapCoords::new(bbox.ur.lat, bbox.ll.lon),
            bbox.ur,
            MapCoords::new(bbox.ll.lat, bbox.ur.lon),
        ].map(|corner| web_mercator(&corner));

        let left = corners.iter().map(|c| c.x).fold(f64::INFINITY, f64::min);
        let right = corners.iter().map(|c| c.x).fold(f64::NEG_INFINITY, f64::max);
        let top = corners.iter().map(|c| c.y).fold(f64::INFINITY, f64::min);
        let bottom = corners.iter().map(|c| c.y).fold(f64::NEG_INFINITY, f64::max);

        let ground_width = ground_distance(&bbox.ll, &MapCoords::new(bbox.ll.lat, bbox.ur.lon));
        let ground_height = ground_distance(&bbox.ll, &MapCoords::new(bbox.ur.lat, bbox.ll.lon));

        Ok(Projector {
            left,
            right,
            top,
            bottom,
            page: PageSize {
                width: ground_width * UNITS_PER_METER / scale,
                height: ground_height * UNITS_PER_METER / scale,
            },
        })
    }

    /// Page position of a coordinate. Positions off the page are returned as they are.
    pub fn project(&self, coords: &MapCoords) -> Coord<f64> {
        let world = web_mercator(coords);
        Coord {
            x: (world.x - self.left) / (self.right - self.left) * self.page.width,
            y: (world.y - self.top) / (self.bottom - self.top) * self.page.height,
        }
    }

    pub fn page(&self) -> PageSize {
        self.page
    }

    pub fn page_width(&self) -> f64 {
        self.page.width
    }

    pub fn page_height(&self) -> f64 {
        self.page.height
    }
}
