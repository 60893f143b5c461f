//! Overpass JSON response types.
//!
//! See: <https://wiki.openstreetmap.org/wiki/Overpass_API/Output_Formats#JSON>

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level `[out:json]` document.
#[derive(Debug, Deserialize)]
pub(super) struct OverpassResponse {
    #[serde(default)]
    pub(super) elements: Vec<OverpassElement>,
}

/// One node, way or relation.
///
/// Only nodes carry `lat`/`lon` directly; other element types are skipped.
#[derive(Debug, Deserialize)]
pub(super) struct OverpassElement {
    #[serde(rename = "type")]
    pub(super) element_type: String,
    pub(super) id: i64,
    pub(super) lat: Option<f64>,
    pub(super) lon: Option<f64>,
    #[serde(default)]
    pub(super) tags: BTreeMap<String, String>,
}
