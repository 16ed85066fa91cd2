//! Approximate point-to-polyline distance.

use geo::{Distance, Haversine, LineString, Point};

use crate::grid::to_meters;

/// Sample fractions along each segment for the sampled method.
const SAMPLE_FRACTIONS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// How point-to-polyline distance is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMethod {
    /// Great-circle distance to five sampled points per segment,
    /// minimum over all samples. Cheap, slightly overestimates the
    /// true distance between samples.
    #[default]
    FivePointSample,
    /// Exact perpendicular projection onto each segment in the local
    /// planar frame. More arithmetic, exact at city scale.
    Projected,
}

/// Minimum distance in meters from a point to a polyline.
///
/// Returns [`f64::INFINITY`] for a polyline with no vertices.
#[must_use]
pub fn point_to_line_meters(
    method: DistanceMethod,
    lat: f64,
    lon: f64,
    line: &LineString<f64>,
) -> f64 {
    match method {
        DistanceMethod::FivePointSample => sampled_distance(lat, lon, line),
        DistanceMethod::Projected => projected_distance(lat, lon, line),
    }
}

fn sampled_distance(lat: f64, lon: f64, line: &LineString<f64>) -> f64 {
    let from = Point::new(lon, lat);
    let mut best = f64::INFINITY;

    if line.0.len() == 1 {
        let v = line.0[0];
        return Haversine.distance(from, Point::new(v.x, v.y));
    }

    for segment in line.0.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        for fraction in SAMPLE_FRACTIONS {
            let sample = Point::new(
                a.x + (b.x - a.x) * fraction,
                a.y + (b.y - a.y) * fraction,
            );
            best = best.min(Haversine.distance(from, sample));
        }
    }
    best
}

fn projected_distance(lat: f64, lon: f64, line: &LineString<f64>) -> f64 {
    let (py, px) = to_meters(lat, lon);
    let mut best = f64::INFINITY;

    if line.0.len() == 1 {
        let (vy, vx) = to_meters(line.0[0].y, line.0[0].x);
        return ((py - vy).powi(2) + (px - vx).powi(2)).sqrt();
    }

    for segment in line.0.windows(2) {
        let (ay, ax) = to_meters(segment[0].y, segment[0].x);
        let (by, bx) = to_meters(segment[1].y, segment[1].x);
        let (dy, dx) = (by - ay, bx - ax);
        let length_sq = dy.mul_add(dy, dx * dx);
        let t = if length_sq == 0.0 {
            0.0
        } else {
            ((py - ay).mul_add(dy, (px - ax) * dx) / length_sq).clamp(0.0, 1.0)
        };
        let (cy, cx) = (t.mul_add(dy, ay), t.mul_add(dx, ax));
        best = best.min(((py - cy).powi(2) + (px - cx).powi(2)).sqrt());
    }
    best
}
