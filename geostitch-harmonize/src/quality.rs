//! Quality metrics for a harmonized collection.
//!
//! The composite score weights geometry validity and attribute completeness
//! at 40 % each and normalised coverage at 20 %. Validity counts dropped
//! geometries against the total, so a dataset that lost features to failed
//! repairs scores lower than one that kept them all.
#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use geo::Validation;
use geostitch_core::stats::coverage_heuristic;
use geostitch_core::{Crs, DatasetKind, Extent};
use serde::Serialize;

use crate::error::DatasetFailure;
use crate::types::{HarmonizeConfig, HarmonizedCollection, HarmonizedFeature};

/// Weight of the geometry-validity ratio in the composite score.
pub const VALIDITY_WEIGHT: f64 = 0.4;
/// Weight of the attribute-completeness ratio in the composite score.
pub const COMPLETENESS_WEIGHT: f64 = 0.4;
/// Weight of normalised coverage in the composite score.
pub const COVERAGE_WEIGHT: f64 = 0.2;

/// Standardized fields every harmonized feature must populate.
pub const REQUIRED_FIELDS: [&str; 4] = ["feature_id", "kind", "source_system", "area_name"];

/// Per-dataset bookkeeping gathered while the pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Datasets that made it into the collection.
    pub datasets_processed: usize,
    /// Geometries kept after repair.
    pub repaired_geometries: usize,
    /// Geometries dropped as unrepairable, per kind.
    pub dropped_by_kind: BTreeMap<DatasetKind, usize>,
    /// Datasets excluded from the collection.
    pub failures: Vec<DatasetFailure>,
    /// Whether every processed dataset ended up in the target CRS.
    pub crs_consistent: bool,
}

impl Default for ProcessingSummary {
    fn default() -> Self {
        Self {
            datasets_processed: 0,
            repaired_geometries: 0,
            dropped_by_kind: BTreeMap::new(),
            failures: Vec::new(),
            crs_consistent: true,
        }
    }
}

impl ProcessingSummary {
    /// Total geometries dropped.
    #[must_use]
    pub fn dropped_geometries(&self) -> usize {
        self.dropped_by_kind.values().sum()
    }
}

/// Quality metrics for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    /// Harmonized features.
    pub total_features: usize,
    /// Valid geometries over retained plus dropped geometries.
    pub geometry_validity_ratio: f64,
    /// [`Self::geometry_validity_ratio`] per kind.
    pub geometry_validity_by_kind: BTreeMap<DatasetKind, f64>,
    /// Mean of [`Self::field_completeness`].
    pub attribute_completeness_ratio: f64,
    /// Share of features populating each required field.
    pub field_completeness: BTreeMap<&'static str, f64>,
    /// Feature count normalised to `0..=100`.
    pub coverage_percentage: f64,
    /// Features per kind; sums to [`Self::total_features`].
    pub feature_counts_by_kind: BTreeMap<DatasetKind, usize>,
    /// Bounding box of the collection.
    pub spatial_extent: Option<Extent>,
    /// CRS of the collection.
    pub crs: Crs,
    /// Whether every dataset was standardized into [`Self::crs`].
    pub crs_consistent: bool,
    /// Geometries kept after repair.
    pub repaired_geometries: usize,
    /// Geometries dropped as unrepairable.
    pub dropped_geometries: usize,
    /// Datasets in the collection.
    pub datasets_processed: usize,
    /// Datasets excluded from the collection.
    pub datasets_failed: usize,
    /// Why each excluded dataset failed.
    pub failures: Vec<DatasetFailure>,
    /// Composite score in `0.0..=1.0`.
    pub quality_score: f64,
}

impl QualityReport {
    /// Assess `collection` together with what the pipeline recorded.
    #[must_use]
    pub fn assess(
        collection: &HarmonizedCollection,
        summary: ProcessingSummary,
        config: &HarmonizeConfig,
    ) -> Self {
        let total_features = collection.len();
        let dropped_geometries = summary.dropped_geometries();
        let valid = count_valid(collection.features.iter());
        let geometry_validity_ratio = ratio(valid, total_features + dropped_geometries);
        let feature_counts_by_kind = collection.counts_by_kind();
        let geometry_validity_by_kind =
            validity_by_kind(collection, &feature_counts_by_kind, &summary.dropped_by_kind);
        let field_completeness = field_completeness(collection);
        let attribute_completeness_ratio = mean(field_completeness.values().copied());
        let coverage_percentage = if total_features == 0 {
            0.0
        } else {
            coverage_heuristic(total_features, config.coverage_saturation)
        };
        let quality_score = composite_score(
            geometry_validity_ratio,
            attribute_completeness_ratio,
            coverage_percentage,
        );
        Self {
            total_features,
            geometry_validity_ratio,
            geometry_validity_by_kind,
            attribute_completeness_ratio,
            field_completeness,
            coverage_percentage,
            feature_counts_by_kind,
            spatial_extent: collection.bounding_rect().map(Extent::from),
            crs: collection.crs,
            crs_consistent: summary.crs_consistent,
            repaired_geometries: summary.repaired_geometries,
            dropped_geometries,
            datasets_processed: summary.datasets_processed,
            datasets_failed: summary.failures.len(),
            failures: summary.failures,
            quality_score,
        }
    }
}

/// Weighted sum of the three components, clamped to `0.0..=1.0`.
///
/// Ratios are in `0.0..=1.0`; coverage is a percentage. Non-finite inputs
/// score zero.
///
/// # Examples
///
/// ```
/// use geostitch_harmonize::composite_score;
///
/// assert!((composite_score(1.0, 1.0, 100.0) - 1.0).abs() < 1e-12);
/// assert_eq!(composite_score(0.0, 0.0, 0.0), 0.0);
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "the composite score is a weighted sum of ratios"
)]
pub const fn composite_score(validity: f64, completeness: f64, coverage_percentage: f64) -> f64 {
    let score = VALIDITY_WEIGHT * validity
        + COMPLETENESS_WEIGHT * completeness
        + COVERAGE_WEIGHT * (coverage_percentage / 100.0);
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

fn count_valid<'a>(features: impl Iterator<Item = &'a HarmonizedFeature>) -> usize {
    features
        .filter(|feature| feature.geometry.is_valid())
        .count()
}

fn validity_by_kind(
    collection: &HarmonizedCollection,
    counts: &BTreeMap<DatasetKind, usize>,
    dropped: &BTreeMap<DatasetKind, usize>,
) -> BTreeMap<DatasetKind, f64> {
    counts
        .keys()
        .chain(dropped.keys())
        .map(|kind| {
            let retained = counts.get(kind).copied().unwrap_or_default();
            let lost = dropped.get(kind).copied().unwrap_or_default();
            let valid = count_valid(
                collection
                    .features
                    .iter()
                    .filter(|feature| feature.kind == *kind),
            );
            (*kind, ratio(valid, retained + lost))
        })
        .collect()
}

fn field_completeness(collection: &HarmonizedCollection) -> BTreeMap<&'static str, f64> {
    let total = collection.len();
    REQUIRED_FIELDS
        .into_iter()
        .map(|field| {
            let populated = collection
                .features
                .iter()
                .filter(|feature| field_populated(feature, field))
                .count();
            (field, ratio(populated, total))
        })
        .collect()
}

fn field_populated(feature: &HarmonizedFeature, field: &str) -> bool {
    match field {
        "feature_id" => !feature.feature_id.trim().is_empty(),
        "area_name" => !feature.area_name.trim().is_empty(),
        // Typed fields are always present.
        _ => true,
    }
}

/// `part / whole`, or zero for an empty whole.
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "feature counts stay far below 2^52"
)]
const fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "averaging a handful of ratios"
)]
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0_usize), |(sum, count), value| {
        (sum + value, count + 1)
    });
    if count == 0 { 0.0 } else { sum / count as f64 }
}
