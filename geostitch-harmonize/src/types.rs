//! Harmonized feature types and pipeline configuration.
#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use geo::{Geometry, Rect};
use geostitch_core::feature::union_bounds;
use geostitch_core::geojson::{feature_collection_to_value, feature_to_value};
use geostitch_core::stats::COVERAGE_SATURATION;
use geostitch_core::{Attributes, Crs, DatasetKind, SourceSystem, TARGET_CRS};
use serde_json::Value;

/// Settings for a [`Harmonizer`](crate::Harmonizer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarmonizeConfig {
    /// CRS every harmonized geometry is expressed in.
    pub target_crs: Crs,
    /// Feature count at which coverage reaches 100 %.
    pub coverage_saturation: usize,
}

impl Default for HarmonizeConfig {
    fn default() -> Self {
        Self {
            target_crs: TARGET_CRS,
            coverage_saturation: COVERAGE_SATURATION,
        }
    }
}

impl HarmonizeConfig {
    /// Override the coverage normalisation constant.
    #[must_use]
    pub const fn with_coverage_saturation(mut self, coverage_saturation: usize) -> Self {
        self.coverage_saturation = coverage_saturation;
        self
    }
}

/// One feature in the standardized schema.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonizedFeature {
    /// Deterministic `"{kind}_{index}"` identifier.
    pub feature_id: String,
    /// Kind the feature was fetched as.
    pub kind: DatasetKind,
    /// System the feature came from.
    pub source_system: SourceSystem,
    /// Area the run was for.
    pub area_name: String,
    /// Valid geometry in the target CRS.
    pub geometry: Geometry<f64>,
    /// Source attributes, untouched.
    pub attributes: Attributes,
}

impl HarmonizedFeature {
    /// Source attributes overlaid with the standardized fields.
    #[must_use]
    pub fn properties(&self) -> Attributes {
        let mut properties = self.attributes.clone();
        properties.insert("feature_id".to_owned(), Value::from(self.feature_id.as_str()));
        properties.insert("kind".to_owned(), Value::from(self.kind.as_str()));
        properties.insert(
            "source_system".to_owned(),
            Value::from(self.source_system.as_str()),
        );
        properties.insert("area_name".to_owned(), Value::from(self.area_name.as_str()));
        properties
    }
}

/// The merged output of one harmonization run.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonizedCollection {
    /// Features, boundary first, then in dataset order.
    pub features: Vec<HarmonizedFeature>,
    /// CRS of every geometry.
    pub crs: Crs,
}

impl HarmonizedCollection {
    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features grouped by kind, in kind order.
    #[must_use]
    pub fn grouped_by_kind(&self) -> BTreeMap<DatasetKind, Vec<&HarmonizedFeature>> {
        let mut groups: BTreeMap<DatasetKind, Vec<&HarmonizedFeature>> = BTreeMap::new();
        for feature in &self.features {
            groups.entry(feature.kind).or_default().push(feature);
        }
        groups
    }

    /// Feature count per kind.
    #[must_use]
    pub fn counts_by_kind(&self) -> BTreeMap<DatasetKind, usize> {
        let mut counts = BTreeMap::new();
        for feature in &self.features {
            *counts.entry(feature.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Bounding box of every geometry.
    #[must_use]
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        union_bounds(self.features.iter().map(|feature| &feature.geometry))
    }

    /// Encode as a GeoJSON `FeatureCollection`.
    #[must_use]
    pub fn to_geojson_value(&self) -> Value {
        feature_collection_to_value(
            self.features
                .iter()
                .map(|feature| feature_to_value(&feature.geometry, feature.properties())),
            Some(self.crs),
        )
    }
}
