//! End-to-end runs: acquisition followed by harmonization.
#![forbid(unsafe_code)]

use geostitch_core::{RunStatus, SkippedDataset};
use geostitch_data::{AcquisitionError, AcquisitionOrchestrator, AcquisitionRequest};
use geostitch_harmonize::{
    GeometryRepair, HarmonizeError, Harmonization, HarmonizedFeature, Harmonizer, OverlayRepair,
};
use log::{error, info};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a run produced no harmonized collection.
#[derive(Debug, Error)]
pub enum RunError {
    /// Acquisition failed: the boundary was unavailable, or the run was
    /// cancelled or timed out.
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    /// Harmonization could not produce a collection.
    #[error(transparent)]
    Harmonization(#[from] HarmonizeError),
}

/// Outcome of one run.
#[derive(Debug)]
pub struct RunReport {
    /// Requested area.
    pub area_name: String,
    /// Overall status.
    pub status: RunStatus,
    /// Harmonized collection and quality report; `None` when the run failed.
    pub harmonization: Option<Harmonization>,
    /// Kinds left out by acquisition.
    pub skipped: Vec<SkippedDataset>,
    /// Failure cause when [`Self::status`] is [`RunStatus::Failed`].
    pub error: Option<RunError>,
}

impl RunReport {
    fn failed(area_name: &str, skipped: Vec<SkippedDataset>, error: RunError) -> Self {
        error!("run for {area_name} failed: {error}");
        Self {
            area_name: area_name.to_owned(),
            status: RunStatus::Failed,
            harmonization: None,
            skipped,
            error: Some(error),
        }
    }

    /// Harmonized features; empty for a failed run.
    #[must_use]
    pub fn features(&self) -> &[HarmonizedFeature] {
        self.harmonization
            .as_ref()
            .map(|harmonization| harmonization.collection.features.as_slice())
            .unwrap_or_default()
    }
}

/// Acquisition and harmonization wired together.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use geostitch::{
///     AcquisitionOrchestrator, AcquisitionRequest, DatasetKind, HarmonizeConfig, Harmonizer,
///     Pipeline, RunStatus,
/// };
/// use geostitch_core::test_support::{StubBoundaryConnector, square_collection};
///
/// let boundary = Arc::new(StubBoundaryConnector::with_collection(square_collection(1)));
/// let pipeline = Pipeline::new(
///     AcquisitionOrchestrator::new(boundary),
///     Harmonizer::new(HarmonizeConfig::default()),
/// );
/// let request = AcquisitionRequest::new("Pankow", [DatasetKind::Buildings]);
/// let runtime = tokio::runtime::Builder::new_current_thread()
///     .enable_all()
///     .build()?;
/// let report = runtime.block_on(pipeline.run(&request));
/// assert_eq!(report.status, RunStatus::PartialSuccess);
/// assert_eq!(report.features().len(), 1);
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct Pipeline<R = OverlayRepair> {
    orchestrator: AcquisitionOrchestrator,
    harmonizer: Harmonizer<R>,
}

impl<R: GeometryRepair> Pipeline<R> {
    /// Combine an orchestrator and a harmonizer.
    #[must_use]
    pub const fn new(orchestrator: AcquisitionOrchestrator, harmonizer: Harmonizer<R>) -> Self {
        Self {
            orchestrator,
            harmonizer,
        }
    }

    /// The acquisition stage.
    #[must_use]
    pub const fn orchestrator(&self) -> &AcquisitionOrchestrator {
        &self.orchestrator
    }

    /// Run to completion.
    pub async fn run(&self, request: &AcquisitionRequest) -> RunReport {
        self.run_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Run until done or until `token` is cancelled.
    ///
    /// The status is [`RunStatus::Succeeded`] only when every requested kind
    /// was fetched and harmonized, [`RunStatus::PartialSuccess`] when some
    /// were skipped or excluded, and [`RunStatus::Failed`] otherwise.
    pub async fn run_with_cancellation(
        &self,
        request: &AcquisitionRequest,
        token: CancellationToken,
    ) -> RunReport {
        let outcome = match self
            .orchestrator
            .run_with_cancellation(request, token)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => return RunReport::failed(&request.area_name, Vec::new(), err.into()),
        };
        let harmonization = match self.harmonizer.harmonize(&outcome.area, outcome.results) {
            Ok(harmonization) => harmonization,
            Err(err) => {
                return RunReport::failed(&request.area_name, outcome.skipped, err.into());
            }
        };
        let status = if outcome.skipped.is_empty() && harmonization.report.failures.is_empty() {
            outcome.status
        } else {
            RunStatus::PartialSuccess
        };
        info!(
            "run for {} finished as {status:?}: {} features, {} skipped",
            request.area_name,
            harmonization.report.total_features,
            outcome.skipped.len()
        );
        RunReport {
            area_name: request.area_name.clone(),
            status,
            harmonization: Some(harmonization),
            skipped: outcome.skipped,
            error: None,
        }
    }
}
