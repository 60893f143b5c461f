//! Harmonization of raw per-kind datasets into one consistent collection.
//!
//! [`Harmonizer::harmonize`] takes the datasets an acquisition run produced
//! together with the area boundary and returns a [`HarmonizedCollection`] in
//! the target CRS plus a [`QualityReport`]. Per dataset it:
//!
//! 1. reprojects into the target CRS ([`standardize_crs`]);
//! 2. clips to the area boundary, except for the boundary itself
//!    ([`clip_dataset`]);
//! 3. repairs or drops invalid geometry ([`validate_geometries`]);
//! 4. maps features onto the standardized schema ([`standardize_schema`]).
//!
//! A dataset that fails is excluded and listed in the report. Only a missing
//! or unusable boundary, or every dataset failing, ends harmonization with an
//! error.

#![forbid(unsafe_code)]

mod error;
mod pipeline;
mod quality;
mod repair;
mod types;

pub use error::{DatasetFailure, HarmonizeError, ProcessingError};
pub use pipeline::{
    Harmonization, Harmonizer, clip_dataset, standardize_crs, standardize_schema,
};
pub use quality::{
    COMPLETENESS_WEIGHT, COVERAGE_WEIGHT, ProcessingSummary, QualityReport, REQUIRED_FIELDS,
    VALIDITY_WEIGHT, composite_score,
};
pub use repair::{GeometryRepair, OverlayRepair, ValidationOutcome, validate_geometries};
pub use types::{HarmonizeConfig, HarmonizedCollection, HarmonizedFeature};
