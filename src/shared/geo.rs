use std::{
    cmp,
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Div, Mul, Sub},
};

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS: Distance = Distance::from_kilometers(6371.0);
pub(crate) const LONGITUDE_DISTANCE: Distance = Distance::from_meters(111_320.0);
pub(crate) const LATITUDE_DISTANCE: Distance = Distance::from_meters(110_540.0);

#[derive(Debug, Clone, Copy, Default)]
pub struct Distance(f64);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl Add for Distance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Distance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0
    }
}

impl Sub for Distance {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Distance {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div for Distance {
    type Output = f64;
    fn div(self, rhs: Self) -> Self::Output {
        self.0 / rhs.0
    }
}

impl Sum for Distance {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|distance| distance.0).sum())
    }
}

impl Distance {
    pub const ZERO: Distance = Distance(0.0);

    pub const fn from_meters(distance: f64) -> Self {
        Self(distance)
    }

    pub const fn from_kilometers(distance: f64) -> Self {
        Self(distance * 1000.0)
    }

    pub const fn as_meters(&self) -> f64 {
        self.0
    }

    pub const fn as_kilometers(&self) -> f64 {
        self.0 / 1000.0
    }
}

/// A WGS84 position. Serialized as `{"lat": .., "lng": ..}` to match the
/// marketplace wire format.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{:.5}, {:.5}", self.latitude, self.longitude))
    }
}

impl Sum for Coordinate {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        let mut count: usize = 0;
        let mut lat: f64 = 0.0;
        let mut lon: f64 = 0.0;
        iter.for_each(|coordinate| {
            count += 1;
            lat += coordinate.latitude;
            lon += coordinate.longitude;
        });
        let count = count as f64;
        Self {
            latitude: lat / count,
            longitude: lon / count,
        }
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(value: Coordinate) -> Self {
        (value.latitude, value.longitude)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle (haversine) distance.
    pub fn distance(&self, coord: &Self) -> Distance {
        let dist_lat = f64::to_radians(coord.latitude - self.latitude);
        let dist_lon = f64::to_radians(coord.longitude - self.longitude);
        let a = f64::powi(f64::sin(dist_lat / 2.0), 2)
            + f64::cos(f64::to_radians(self.latitude))
                * f64::cos(f64::to_radians(coord.latitude))
                * f64::sin(dist_lon / 2.0)
                * f64::sin(dist_lon / 2.0);
        let c = 2.0 * f64::atan2(f64::sqrt(a), f64::sqrt(1.0 - a));
        Distance::from_kilometers(EARTH_RADIUS.as_kilometers() * c)
    }

    /// Grid cell of the given edge length, used for coarse spatial bucketing.
    pub fn to_grid(&self, cell: Distance) -> (i32, i32) {
        let x = (self.longitude * LONGITUDE_DISTANCE.as_meters() / cell.as_meters()).floor() as i32;
        let y = (self.latitude * LATITUDE_DISTANCE.as_meters() / cell.as_meters()).floor() as i32;
        (x, y)
    }

    /// Parses `"<lat>, <lng>"`. Returns None for anything else, including
    /// out of range values.
    pub fn parse_pair(value: &str) -> Option<Self> {
        let (lat, lng) = value.trim().split_once(',')?;
        let latitude: f64 = lat.trim().parse().ok()?;
        let longitude: f64 = lng.trim().parse().ok()?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }
}

/// Result of projecting a point onto a segment.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    /// Distance from the point to its projection.
    pub distance: Distance,
    /// Position of the projection along the segment, in `[0, 1]`.
    pub fraction: f64,
}

/// Projects `point` onto the segment `a -> b`.
///
/// Works in a local equirectangular frame centred on the segment, which is
/// accurate to well under a meter for the short segments of a road polyline.
pub fn project_onto_segment(point: &Coordinate, a: &Coordinate, b: &Coordinate) -> Projection {
    let radius = EARTH_RADIUS.as_meters();
    let mean_lat = f64::to_radians((a.latitude + b.latitude) / 2.0);
    let to_xy = |coord: &Coordinate| {
        (
            f64::to_radians(coord.longitude - a.longitude) * mean_lat.cos() * radius,
            f64::to_radians(coord.latitude - a.latitude) * radius,
        )
    };
    let (bx, by) = to_xy(b);
    let (px, py) = to_xy(point);
    let length_sq = bx * bx + by * by;
    let fraction = if length_sq == 0.0 {
        0.0
    } else {
        ((px * bx + py * by) / length_sq).clamp(0.0, 1.0)
    };
    let (dx, dy) = (px - bx * fraction, py - by * fraction);
    Projection {
        distance: Distance::from_meters((dx * dx + dy * dy).sqrt()),
        fraction,
    }
}

/// Axis aligned bounds, serialized in GeoJSON order `[west, south, east, north]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([west, south, east, north]: [f64; 4]) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(value: BoundingBox) -> Self {
        [value.west, value.south, value.east, value.north]
    }
}

impl BoundingBox {
    pub fn from_coordinates<'a, I>(coordinates: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coordinate>,
    {
        coordinates.into_iter().fold(None, |bounds, coord| {
            let bounds = bounds.unwrap_or(Self {
                west: coord.longitude,
                south: coord.latitude,
                east: coord.longitude,
                north: coord.latitude,
            });
            Some(Self {
                west: bounds.west.min(coord.longitude),
                south: bounds.south.min(coord.latitude),
                east: bounds.east.max(coord.longitude),
                north: bounds.north.max(coord.latitude),
            })
        })
    }

    /// Grows the box by `margin` on every side.
    pub fn expand(&self, margin: Distance) -> Self {
        let dlat = margin.as_meters() / LATITUDE_DISTANCE.as_meters();
        let widest = self.south.abs().max(self.north.abs()).min(89.0);
        let dlng =
            margin.as_meters() / (LONGITUDE_DISTANCE.as_meters() * f64::to_radians(widest).cos());
        Self {
            west: self.west - dlng,
            south: self.south - dlat,
            east: self.east + dlng,
            north: self.north + dlat,
        }
    }

    pub fn contains(&self, coord: &Coordinate) -> bool {
        (self.south..=self.north).contains(&coord.latitude)
            && (self.west..=self.east).contains(&coord.longitude)
    }
}

#[test]
fn distance_test() {
    let coord_a = Coordinate::new(48.85800943005911, 2.3514350059357927);
    let coord_b = Coordinate::new(51.5052389927712, -0.12495407345099824);
    let d = coord_a.distance(&coord_b);
    assert!((d.as_kilometers() - 343.5).abs() < 2.0);
}

#[test]
fn distance_eq_test() {
    let dist_a = Distance::from_meters(1000.0);
    let dist_b = Distance::from_kilometers(1.0);
    assert_eq!(dist_a, dist_b)
}

#[test]
fn distance_cmp_test() {
    let dist_a = Distance::from_meters(1000.0);
    let dist_b = Distance::from_kilometers(0.5);
    assert!(dist_a > dist_b)
}

#[test]
fn parse_pair_test() {
    let coord = Coordinate::parse_pair(" 18.5204 , 73.8567 ").unwrap();
    assert_eq!(coord, Coordinate::new(18.5204, 73.8567));
    assert!(Coordinate::parse_pair("Baner").is_none());
    assert!(Coordinate::parse_pair("95.0, 10.0").is_none());
}

#[test]
fn projection_clamps_to_segment_ends() {
    let a = Coordinate::new(18.50, 73.80);
    let b = Coordinate::new(18.50, 73.90);
    let before = project_onto_segment(&Coordinate::new(18.50, 73.70), &a, &b);
    assert_eq!(before.fraction, 0.0);
    let middle = project_onto_segment(&Coordinate::new(18.51, 73.85), &a, &b);
    assert!((middle.fraction - 0.5).abs() < 1e-3);
    assert!((middle.distance.as_kilometers() - 1.11).abs() < 0.01);
}

#[test]
fn bbox_serializes_as_array() {
    let bbox = BoundingBox::from_coordinates(&[
        Coordinate::new(18.5, 73.8),
        Coordinate::new(18.6, 73.7),
    ])
    .unwrap();
    let json = serde_json::to_string(&bbox).unwrap();
    assert_eq!(json, "[73.7,18.5,73.8,18.6]");
}
