//! Serde mirror of the GeoJSON document structure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub(super) type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
pub(super) struct WireCollection {
    #[serde(default)]
    pub(super) features: Vec<WireFeature>,
    #[serde(default)]
    pub(super) crs: Option<WireCrs>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireFeature {
    #[serde(default)]
    pub(super) id: Option<Value>,
    #[serde(default)]
    pub(super) geometry: Option<WireGeometry>,
    #[serde(default)]
    pub(super) properties: Option<Map<String, Value>>,
}

/// Named CRS member as emitted by OGC services.
#[derive(Debug, Deserialize)]
pub(super) struct WireCrs {
    #[serde(default)]
    pub(super) properties: Option<WireCrsProperties>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireCrsProperties {
    pub(super) name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub(super) enum WireGeometry {
    Point {
        coordinates: Position,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<WireGeometry>,
    },
}
