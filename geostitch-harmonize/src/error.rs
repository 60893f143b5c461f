//! Error types raised while harmonizing datasets.
#![forbid(unsafe_code)]

use geostitch_core::{AreaError, CrsError, DatasetKind};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Failure while processing one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    /// The dataset could not be reprojected into the target CRS.
    #[error("failed to reproject dataset: {0}")]
    Reprojection(#[from] CrsError),
    /// The area boundary could not be expressed in the target CRS.
    #[error("failed to prepare area boundary: {0}")]
    Area(#[from] AreaError),
}

/// A dataset excluded from the harmonized collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetFailure {
    /// Kind of the excluded dataset.
    pub kind: DatasetKind,
    /// Why it was excluded.
    #[serde(rename = "reason", serialize_with = "display")]
    pub error: ProcessingError,
}

fn display<S: Serializer>(error: &ProcessingError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Reasons harmonization produced no collection at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarmonizeError {
    /// The boundary dataset was missing or could not be processed.
    #[error("area boundary unavailable")]
    BoundaryUnavailable {
        /// Processing failure, when the boundary was present but unusable.
        #[source]
        source: Option<ProcessingError>,
    },
    /// No dataset could be processed.
    #[error("all {} datasets failed to process", failures.len())]
    AllDatasetsFailed {
        /// One entry per dataset.
        failures: Vec<DatasetFailure>,
    },
}
