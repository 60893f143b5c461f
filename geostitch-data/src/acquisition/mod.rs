//! Concurrent acquisition of every requested dataset kind for one area.
//!
//! [`AcquisitionOrchestrator`] fetches the boundary first, builds the
//! [`AreaOfInterest`] from it and then fans out one task per remaining kind.
//! A boundary failure ends the run; any other failure becomes a
//! [`SkippedDataset`] and the run continues with what did arrive.

mod orchestrator;

pub use orchestrator::AcquisitionOrchestrator;

use std::collections::BTreeSet;
use std::iter;
use std::time::Duration;

use geostitch_core::{
    AreaOfInterest, ConnectorError, DatasetKind, RawDatasetResult, RunStatus, SkippedDataset,
};
use thiserror::Error;

/// Area name plus the dataset kinds a caller asked for.
///
/// The boundary is always fetched, whether or not it is listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionRequest {
    /// Name of the area, e.g. a Berlin district.
    pub area_name: String,
    /// Requested kinds.
    pub kinds: BTreeSet<DatasetKind>,
}

impl AcquisitionRequest {
    /// Build a request.
    #[must_use]
    pub fn new(area_name: impl Into<String>, kinds: impl IntoIterator<Item = DatasetKind>) -> Self {
        Self {
            area_name: area_name.into(),
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Kinds in fetch order: the boundary once, then the rest.
    #[must_use]
    pub fn plan(&self) -> Vec<DatasetKind> {
        iter::once(DatasetKind::Boundary)
            .chain(self.kinds.iter().copied().filter(|kind| !kind.is_boundary()))
            .collect()
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionOutcome {
    /// Area built from the boundary dataset.
    pub area: AreaOfInterest,
    /// [`RunStatus::Succeeded`] or [`RunStatus::PartialSuccess`].
    pub status: RunStatus,
    /// Fetched datasets, boundary first, in plan order.
    pub results: Vec<RawDatasetResult>,
    /// Kinds left out of [`Self::results`], in plan order.
    pub skipped: Vec<SkippedDataset>,
}

impl AcquisitionOutcome {
    /// The boundary dataset.
    #[must_use]
    pub fn boundary(&self) -> Option<&RawDatasetResult> {
        self.results.iter().find(|result| result.kind.is_boundary())
    }

    /// Kinds that were skipped.
    #[must_use]
    pub fn skipped_kinds(&self) -> Vec<DatasetKind> {
        self.skipped.iter().map(|skipped| skipped.kind).collect()
    }
}

/// Reasons a run produced no datasets at all.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// The boundary could not be fetched or held no polygons.
    #[error("boundary for {area:?} is unavailable: {source}")]
    BoundaryUnavailable {
        /// Requested area name.
        area: String,
        /// Underlying connector failure.
        #[source]
        source: ConnectorError,
    },
    /// The caller cancelled the run.
    #[error("acquisition cancelled")]
    Cancelled,
    /// The run exceeded its time budget.
    #[error("acquisition timed out after {after:?}")]
    TimedOut {
        /// Configured budget.
        after: Duration,
    },
}

impl AcquisitionError {
    /// Run status reported for this error.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        RunStatus::Failed
    }
}

/// Run-level settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Budget for a whole run; `None` waits indefinitely.
    pub run_timeout: Option<Duration>,
}

impl OrchestratorConfig {
    /// Set the run budget.
    #[must_use]
    pub const fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = Some(run_timeout);
        self
    }
}
