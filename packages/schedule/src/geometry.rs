//! Strict segment geometry parsing.
//!
//! Schedule rows embed their centerline geometry as `LineString` text.
//! The CSV export writes it in python-repr form (single quotes), the
//! API as proper `GeoJSON`; both are normalized to JSON text and then
//! parsed with the schema-validating `geojson` crate. Anything that is
//! not a well-formed, in-range `LineString` is a typed error; callers
//! keep the rule and drop only its geometry.

use geo::LineString;
use geojson::{GeoJson, Value};

/// Why a geometry string was rejected.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// Empty or whitespace-only input.
    #[error("empty geometry text")]
    Empty,

    /// Not parseable as `GeoJSON` at all.
    #[error("malformed geometry: {0}")]
    Malformed(#[from] geojson::Error),

    /// Parsed, but not a bare `LineString` geometry.
    #[error("expected a LineString geometry, got {found}")]
    NotLineString {
        /// What the text actually contained.
        found: String,
    },

    /// A `LineString` with no vertices.
    #[error("LineString has no coordinates")]
    NoCoordinates,

    /// A vertex outside valid lon/lat ranges.
    #[error("coordinate out of range: ({lon}, {lat})")]
    OutOfRange {
        /// Offending longitude.
        lon: f64,
        /// Offending latitude.
        lat: f64,
    },
}

/// Parses embedded `LineString` text into a [`LineString`] (lon/lat
/// order, matching `GeoJSON`).
///
/// # Errors
///
/// Returns [`GeometryError`] if the text is empty, malformed, not a
/// `LineString`, or carries out-of-range coordinates.
pub fn parse_line(text: &str) -> Result<LineString<f64>, GeometryError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GeometryError::Empty);
    }

    // The CSV export stores geometry as a python repr: single-quoted
    // keys, otherwise identical to GeoJSON. Geometry text never
    // contains apostrophes in values, so a plain swap is safe.
    let json_text = if trimmed.starts_with("{'") {
        trimmed.replace('\'', "\"")
    } else {
        trimmed.to_string()
    };

    let geojson: GeoJson = json_text.parse()?;
    let GeoJson::Geometry(geometry) = geojson else {
        return Err(GeometryError::NotLineString {
            found: kind_of(&geojson).to_string(),
        });
    };

    let kind = value_kind(&geometry.value);
    let Value::LineString(positions) = geometry.value else {
        return Err(GeometryError::NotLineString {
            found: kind.to_string(),
        });
    };

    if positions.is_empty() {
        return Err(GeometryError::NoCoordinates);
    }

    let mut coords = Vec::with_capacity(positions.len());
    for position in &positions {
        let (Some(&lon), Some(&lat)) = (position.first(), position.get(1)) else {
            return Err(GeometryError::NoCoordinates);
        };
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(GeometryError::OutOfRange { lon, lat });
        }
        coords.push((lon, lat));
    }

    Ok(LineString::from(coords))
}

const fn kind_of(geojson: &GeoJson) -> &'static str {
    match geojson {
        GeoJson::Geometry(_) => "Geometry",
        GeoJson::Feature(_) => "Feature",
        GeoJson::FeatureCollection(_) => "FeatureCollection",
    }
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Serializes a [`LineString`] back to `GeoJSON` text for the rule CSV
/// round-trip.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if serialization fails.
pub fn line_to_text(line: &LineString<f64>) -> Result<String, serde_json::Error> {
    let geometry = geojson::Geometry::new(Value::from(line));
    serde_json::to_string(&geometry)
}
