use serde::{Deserialize, Serialize};
use crate::constants::EARTH_RADIUS_M;

/// WGS84 coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in metres
    #[must_use]
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }

    /// Initial bearing towards `other` in degrees, 0 = north, clockwise
    #[must_use]
    pub fn bearing_to(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlon = (other.lon - self.lon).to_radians();
        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        (y.atan2(x).to_degrees() + 360.0) % 360.0
    }

    /// Linear interpolation in coordinate space; fine at track-segment scale
    #[must_use]
    pub fn lerp(&self, other: &GeoPoint, t: f64) -> GeoPoint {
        GeoPoint {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }

    /// Project into a local east/north plane in metres around `origin`
    /// (equirectangular, adequate for station-sized extents)
    #[must_use]
    pub fn to_local(&self, origin: &GeoPoint) -> (f64, f64) {
        let x = (self.lon - origin.lon).to_radians() * origin.lat.to_radians().cos() * EARTH_RADIUS_M;
        let y = (self.lat - origin.lat).to_radians() * EARTH_RADIUS_M;
        (x, y)
    }
}

/// Mean of a set of points, `None` when empty
#[must_use]
pub fn centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
    if points.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let (lat, lon) = points.iter().fold((0.0, 0.0), |(la, lo), p| (la + p.lat, lo + p.lon));
    Some(GeoPoint::new(lat / n, lon / n))
}

/// Sum of great-circle distances between consecutive polyline vertices
#[must_use]
pub fn polyline_length(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Walk `distance` metres along a polyline and return the point reached and
/// the bearing of the piece it lies on. Distances past either end clamp.
#[must_use]
pub fn point_along_polyline(points: &[GeoPoint], distance: f64) -> Option<(GeoPoint, f64)> {
    let first = points.first()?;
    if points.len() == 1 {
        return Some((*first, 0.0));
    }

    let mut remaining = distance.max(0.0);
    for w in points.windows(2) {
        let piece = w[0].distance_to(&w[1]);
        if remaining <= piece && piece > 0.0 {
            return Some((w[0].lerp(&w[1], remaining / piece), w[0].bearing_to(&w[1])));
        }
        remaining -= piece;
    }

    // Past the end: last vertex with the bearing of the last non-degenerate piece
    let last = points[points.len() - 1];
    let bearing = points
        .windows(2)
        .rev()
        .find(|w| w[0].distance_to(&w[1]) > 0.0)
        .map_or(0.0, |w| w[0].bearing_to(&w[1]));
    Some((last, bearing))
}

/// Normalise a 2D vector, `None` for (near) zero length
#[must_use]
pub fn normalize(v: (f64, f64)) -> Option<(f64, f64)> {
    let len = (v.0 * v.0 + v.1 * v.1).sqrt();
    if len < 1e-9 {
        None
    } else {
        Some((v.0 / len, v.1 / len))
    }
}

#[must_use]
pub fn dot(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.0 + a.1 * b.1
}

/// Computes the 2D cross product to determine the orientation of a point relative to a line.
///
/// Returns a positive value if the point is to the left of the line (counter-clockwise),
/// negative if to the right (clockwise), and zero if collinear.
///
/// # Arguments
/// * `line_start` - Starting point of the line segment
/// * `line_end` - Ending point of the line segment
/// * `point` - Point to test
#[must_use]
pub fn cross_product_2d(line_start: (f64, f64), line_end: (f64, f64), point: (f64, f64)) -> f64 {
    (line_end.0 - line_start.0) * (point.1 - line_start.1) -
    (line_end.1 - line_start.1) * (point.0 - line_start.0)
}
