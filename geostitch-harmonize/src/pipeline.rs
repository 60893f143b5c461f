//! Per-dataset harmonization steps and the [`Harmonizer`] that runs them.
//!
//! Each dataset is reprojected, clipped to the area, validated and mapped
//! onto the standardized schema, in that order. Repaired geometry is clipped
//! a second time. A dataset that fails any step is recorded and excluded;
//! the run itself only fails when the boundary is unusable or nothing could
//! be processed.
#![forbid(unsafe_code)]

use geostitch_core::spatial::{bbox_prefilter, clip_or_fallback};
use geostitch_core::{AreaOfInterest, Crs, DatasetKind, FeatureCollection, RawDatasetResult};
use log::{debug, info, warn};

use crate::error::{DatasetFailure, HarmonizeError, ProcessingError};
use crate::quality::{ProcessingSummary, QualityReport};
use crate::repair::{GeometryRepair, OverlayRepair, ValidationOutcome, validate_geometries};
use crate::types::{HarmonizeConfig, HarmonizedCollection, HarmonizedFeature};

/// Reproject `collection` into `target`.
///
/// A collection without a declared CRS is assumed to already be in `target`.
///
/// # Errors
///
/// Returns [`ProcessingError::Reprojection`] when the source CRS is not
/// supported or a coordinate falls outside its projection.
pub fn standardize_crs(
    collection: FeatureCollection,
    target: Crs,
) -> Result<FeatureCollection, ProcessingError> {
    collection.into_crs(target).map_err(ProcessingError::from)
}

/// Clip a dataset to the area boundary.
///
/// The boundary dataset is returned unchanged. Others are filtered by the
/// area's bounding box and then intersected with its polygons; when the
/// intersection fails the bbox-filtered features are kept.
#[must_use]
pub fn clip_dataset(
    kind: DatasetKind,
    collection: FeatureCollection,
    area: &AreaOfInterest,
) -> FeatureCollection {
    if kind.is_boundary() {
        return collection;
    }
    let filtered = bbox_prefilter(collection, area.bounds());
    clip_or_fallback(filtered, area.boundary(), kind.as_str())
}

/// Map features onto the standardized schema with ids `"{kind}_{index}"`.
#[must_use]
pub fn standardize_schema(
    kind: DatasetKind,
    area_name: &str,
    collection: FeatureCollection,
) -> Vec<HarmonizedFeature> {
    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| HarmonizedFeature {
            feature_id: format!("{kind}_{index}"),
            kind,
            source_system: kind.source_system(),
            area_name: area_name.to_owned(),
            geometry: feature.geometry,
            attributes: feature.attributes,
        })
        .collect()
}

/// A harmonized collection and its quality report.
#[derive(Debug, Clone, PartialEq)]
pub struct Harmonization {
    /// The merged features.
    pub collection: HarmonizedCollection,
    /// Quality metrics for [`Self::collection`].
    pub report: QualityReport,
}

struct ProcessedDataset {
    features: Vec<HarmonizedFeature>,
    repaired: usize,
    dropped: usize,
    in_target_crs: bool,
}

/// Runs the harmonization pipeline.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
///
/// use geo::{MultiPolygon, polygon};
/// use geostitch_core::{
///     AreaOfInterest, DatasetKind, Feature, FeatureCollection, RawDatasetResult, RuntimeStats,
///     TARGET_CRS,
/// };
/// use geostitch_harmonize::{HarmonizeConfig, Harmonizer};
///
/// let square = polygon![
///     (x: 0.0, y: 0.0),
///     (x: 10.0, y: 0.0),
///     (x: 10.0, y: 10.0),
///     (x: 0.0, y: 10.0),
///     (x: 0.0, y: 0.0),
/// ];
/// let area = AreaOfInterest::new("Pankow", MultiPolygon::new(vec![square.clone()]), TARGET_CRS)?;
/// let boundary = FeatureCollection::new(vec![Feature::from_geometry(square)], Some(TARGET_CRS));
/// let stats = RuntimeStats::success(Duration::ZERO, &boundary, UNIX_EPOCH);
/// let datasets = vec![RawDatasetResult::new(DatasetKind::Boundary, boundary, stats)];
///
/// let harmonization = Harmonizer::new(HarmonizeConfig::default()).harmonize(&area, datasets)?;
/// assert_eq!(harmonization.collection.len(), 1);
/// assert_eq!(harmonization.collection.features[0].feature_id, "boundary_0");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Harmonizer<R = OverlayRepair> {
    config: HarmonizeConfig,
    repair: R,
}

impl Harmonizer {
    /// Create a harmonizer that repairs geometry with [`OverlayRepair`].
    #[must_use]
    pub const fn new(config: HarmonizeConfig) -> Self {
        Self {
            config,
            repair: OverlayRepair,
        }
    }
}

impl<R: GeometryRepair> Harmonizer<R> {
    /// Swap the repair strategy.
    #[must_use]
    pub fn with_repair<S: GeometryRepair>(self, repair: S) -> Harmonizer<S> {
        Harmonizer {
            config: self.config,
            repair,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &HarmonizeConfig {
        &self.config
    }

    /// Harmonize every dataset of one run.
    ///
    /// The boundary dataset is processed first whatever its position in
    /// `datasets`; the rest keep their order.
    ///
    /// # Errors
    ///
    /// Returns [`HarmonizeError::BoundaryUnavailable`] when no boundary
    /// dataset is present, the area cannot be expressed in the target CRS or
    /// the boundary dataset fails to process, and
    /// [`HarmonizeError::AllDatasetsFailed`] when no dataset could be
    /// processed.
    pub fn harmonize(
        &self,
        area: &AreaOfInterest,
        mut datasets: Vec<RawDatasetResult>,
    ) -> Result<Harmonization, HarmonizeError> {
        if !datasets.iter().any(|dataset| dataset.kind.is_boundary()) {
            return Err(HarmonizeError::BoundaryUnavailable { source: None });
        }
        let target_area = area.to_crs(self.config.target_crs).map_err(|err| {
            HarmonizeError::BoundaryUnavailable {
                source: Some(ProcessingError::Area(err)),
            }
        })?;
        datasets.sort_by_key(|dataset| !dataset.kind.is_boundary());

        let mut features = Vec::new();
        let mut summary = ProcessingSummary::default();
        let mut boundary_error = None;
        for dataset in datasets {
            let kind = dataset.kind;
            match self.process(&target_area, dataset) {
                Ok(processed) => {
                    summary.datasets_processed += 1;
                    summary.repaired_geometries += processed.repaired;
                    if processed.dropped > 0 {
                        *summary.dropped_by_kind.entry(kind).or_insert(0) += processed.dropped;
                    }
                    summary.crs_consistent &= processed.in_target_crs;
                    features.extend(processed.features);
                }
                Err(error) => {
                    warn!("excluding {kind} from harmonization: {error}");
                    if kind.is_boundary() && boundary_error.is_none() {
                        boundary_error = Some(error.clone());
                    }
                    summary.failures.push(DatasetFailure { kind, error });
                }
            }
        }

        if summary.datasets_processed == 0 {
            return Err(HarmonizeError::AllDatasetsFailed {
                failures: summary.failures,
            });
        }
        if let Some(source) = boundary_error {
            return Err(HarmonizeError::BoundaryUnavailable {
                source: Some(source),
            });
        }

        let collection = HarmonizedCollection {
            features,
            crs: self.config.target_crs,
        };
        let report = QualityReport::assess(&collection, summary, &self.config);
        info!(
            "harmonized {} features for {} ({} datasets, {} failed, score {:.3})",
            report.total_features,
            target_area.name(),
            report.datasets_processed,
            report.datasets_failed,
            report.quality_score
        );
        Ok(Harmonization { collection, report })
    }

    fn process(
        &self,
        area: &AreaOfInterest,
        dataset: RawDatasetResult,
    ) -> Result<ProcessedDataset, ProcessingError> {
        let kind = dataset.kind;
        let standardized = standardize_crs(dataset.collection, self.config.target_crs)?;
        let clipped = clip_dataset(kind, standardized, area);
        let ValidationOutcome {
            collection: validated,
            repaired,
            dropped,
        } = validate_geometries(clipped, &self.repair);
        // Invalid polygons pass through clipping unchanged, so their repaired
        // form can still reach past the boundary.
        let collection = if repaired > 0 {
            clip_dataset(kind, validated, area)
        } else {
            validated
        };
        let in_target_crs = collection.crs == Some(self.config.target_crs);
        debug!(
            "{kind}: {} features kept, {repaired} repaired, {dropped} dropped",
            collection.len()
        );
        Ok(ProcessedDataset {
            features: standardize_schema(kind, area.name(), collection),
            repaired,
            dropped,
            in_target_crs,
        })
    }
}
