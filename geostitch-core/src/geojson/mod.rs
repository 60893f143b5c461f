//! GeoJSON decoding into [`FeatureCollection`] and encoding back out.
//!
//! Decoding is lenient in the ways upstream services need: features with a
//! null geometry are skipped, a missing `features` member is an empty
//! collection, third ordinates are ignored and the legacy named `crs` member
//! is honoured when present.

mod wire;

use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use log::debug;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::crs::{Crs, CrsError};
use crate::feature::{Attributes, Feature, FeatureCollection};

use wire::{Position, WireCollection, WireFeature, WireGeometry};

/// Errors raised while decoding GeoJSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoJsonError {
    /// The payload is not valid GeoJSON.
    #[error("invalid GeoJSON: {message}")]
    Syntax {
        /// Parser error text.
        message: String,
    },
    /// A position had fewer than two ordinates.
    #[error("position with {len} ordinates; at least two are required")]
    ShortPosition {
        /// Ordinates present.
        len: usize,
    },
    /// The `crs` member named an unrecognised CRS.
    #[error(transparent)]
    Crs(#[from] CrsError),
}

/// Decode a GeoJSON `FeatureCollection`.
///
/// # Errors
///
/// Returns [`GeoJsonError`] for malformed JSON, short positions or an
/// unrecognised `crs` member.
pub fn parse_feature_collection(bytes: &[u8]) -> Result<FeatureCollection, GeoJsonError> {
    let wire: WireCollection =
        serde_json::from_slice(bytes).map_err(|err| GeoJsonError::Syntax {
            message: err.to_string(),
        })?;
    let crs = wire
        .crs
        .and_then(|crs| crs.properties)
        .map(|properties| Crs::parse(&properties.name))
        .transpose()?;
    let total = wire.features.len();
    let features = wire
        .features
        .into_iter()
        .filter_map(|feature| decode_feature(feature).transpose())
        .collect::<Result<Vec<_>, _>>()?;
    if features.len() < total {
        debug!(
            "skipped {} features without geometry",
            total - features.len()
        );
    }
    Ok(FeatureCollection::new(features, crs))
}

fn decode_feature(feature: WireFeature) -> Result<Option<Feature>, GeoJsonError> {
    let Some(geometry) = feature.geometry else {
        return Ok(None);
    };
    let mut attributes: Attributes = feature.properties.unwrap_or_default();
    if let Some(id) = feature.id {
        attributes.entry("id").or_insert(id);
    }
    Ok(Some(Feature::new(decode_geometry(geometry)?, attributes)))
}

fn decode_geometry(geometry: WireGeometry) -> Result<Geometry<f64>, GeoJsonError> {
    Ok(match geometry {
        WireGeometry::Point { coordinates } => Geometry::Point(Point::from(coord(&coordinates)?)),
        WireGeometry::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint::new(
            coordinates
                .iter()
                .map(|position| coord(position).map(Point::from))
                .collect::<Result<_, _>>()?,
        )),
        WireGeometry::LineString { coordinates } => {
            Geometry::LineString(line_string(&coordinates)?)
        }
        WireGeometry::MultiLineString { coordinates } => {
            Geometry::MultiLineString(MultiLineString::new(
                coordinates
                    .iter()
                    .map(|line| line_string(line))
                    .collect::<Result<_, _>>()?,
            ))
        }
        WireGeometry::Polygon { coordinates } => Geometry::Polygon(polygon(&coordinates)?),
        WireGeometry::MultiPolygon { coordinates } => Geometry::MultiPolygon(MultiPolygon::new(
            coordinates
                .iter()
                .map(|rings| polygon(rings))
                .collect::<Result<_, _>>()?,
        )),
        WireGeometry::GeometryCollection { geometries } => {
            Geometry::GeometryCollection(GeometryCollection::new_from(
                geometries
                    .into_iter()
                    .map(decode_geometry)
                    .collect::<Result<_, _>>()?,
            ))
        }
    })
}

fn coord(position: &[f64]) -> Result<Coord<f64>, GeoJsonError> {
    match position {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(GeoJsonError::ShortPosition {
            len: position.len(),
        }),
    }
}

fn line_string(positions: &[Position]) -> Result<LineString<f64>, GeoJsonError> {
    positions
        .iter()
        .map(|position| coord(position))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>, GeoJsonError> {
    let mut parsed = rings.iter().map(|ring| line_string(ring));
    let exterior = parsed
        .next()
        .transpose()?
        .unwrap_or_else(|| LineString::new(Vec::new()));
    let interiors = parsed.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Encode a geometry as a GeoJSON geometry object.
#[must_use]
pub fn geometry_to_value(geometry: &Geometry<f64>) -> Value {
    let wire = encode_geometry(geometry);
    serde_json::to_value(wire).unwrap_or(Value::Null)
}

fn encode_geometry(geometry: &Geometry<f64>) -> WireGeometry {
    match geometry {
        Geometry::Point(point) => WireGeometry::Point {
            coordinates: position(point.0),
        },
        Geometry::MultiPoint(points) => WireGeometry::MultiPoint {
            coordinates: points.iter().map(|point| position(point.0)).collect(),
        },
        Geometry::Line(line) => WireGeometry::LineString {
            coordinates: vec![position(line.start), position(line.end)],
        },
        Geometry::LineString(line) => WireGeometry::LineString {
            coordinates: positions(line),
        },
        Geometry::MultiLineString(lines) => WireGeometry::MultiLineString {
            coordinates: lines.iter().map(positions).collect(),
        },
        Geometry::Polygon(polygon) => WireGeometry::Polygon {
            coordinates: rings(polygon),
        },
        Geometry::MultiPolygon(polygons) => WireGeometry::MultiPolygon {
            coordinates: polygons.iter().map(rings).collect(),
        },
        Geometry::Rect(rect) => WireGeometry::Polygon {
            coordinates: rings(&rect.to_polygon()),
        },
        Geometry::Triangle(triangle) => WireGeometry::Polygon {
            coordinates: rings(&triangle.to_polygon()),
        },
        Geometry::GeometryCollection(collection) => WireGeometry::GeometryCollection {
            geometries: collection.iter().map(encode_geometry).collect(),
        },
    }
}

fn position(coord: Coord<f64>) -> Position {
    vec![coord.x, coord.y]
}

fn positions(line: &LineString<f64>) -> Vec<Position> {
    line.coords().copied().map(position).collect()
}

fn rings(polygon: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(positions)
        .collect()
}

/// Encode one GeoJSON `Feature` object.
#[must_use]
pub fn feature_to_value(geometry: &Geometry<f64>, properties: Map<String, Value>) -> Value {
    json!({
        "type": "Feature",
        "geometry": geometry_to_value(geometry),
        "properties": Value::Object(properties),
    })
}

/// Encode a `FeatureCollection` object with a named `crs` member.
#[must_use]
pub fn feature_collection_to_value<I>(features: I, crs: Option<Crs>) -> Value
where
    I: IntoIterator<Item = Value>,
{
    let mut document = json!({
        "type": "FeatureCollection",
        "features": features.into_iter().collect::<Vec<_>>(),
    });
    if let (Some(crs), Some(object)) = (crs, document.as_object_mut()) {
        object.insert(
            "crs".to_owned(),
            json!({
                "type": "name",
                "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", crs.epsg()) },
            }),
        );
    }
    document
}

impl FeatureCollection {
    /// Encode the collection as GeoJSON.
    #[must_use]
    pub fn to_geojson_value(&self) -> Value {
        feature_collection_to_value(
            self.features
                .iter()
                .map(|feature| feature_to_value(&feature.geometry, feature.attributes.clone())),
            self.crs,
        )
    }
}
