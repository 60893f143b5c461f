//! Boundary-first fan-out over injected connectors.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use futures_util::FutureExt;
use futures_util::future::join_all;
use geostitch_core::{
    AreaOfInterest, BoundaryConnector, ConnectorError, DatasetKind, RawDatasetResult, RunStatus,
    RuntimeStats, SkipReason, SkippedDataset, SourceConnector,
};
use log::{debug, error, info, warn};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::{AcquisitionError, AcquisitionOutcome, AcquisitionRequest, OrchestratorConfig};

/// States a run passes through, logged as it moves.
#[derive(Debug, Clone, Copy)]
enum RunPhase {
    Started,
    FetchingBoundary,
    FetchingOptional,
    Finished(RunStatus),
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => f.write_str("started"),
            Self::FetchingBoundary => f.write_str("fetching boundary"),
            Self::FetchingOptional => f.write_str("fetching optional datasets"),
            Self::Finished(RunStatus::Succeeded) => f.write_str("succeeded"),
            Self::Finished(RunStatus::PartialSuccess) => f.write_str("partial success"),
            Self::Finished(RunStatus::Failed) => f.write_str("failed"),
        }
    }
}

fn enter(area: &str, phase: RunPhase) {
    debug!("acquisition for {area}: {phase}");
}

type TaskOutcome = Result<RawDatasetResult, SkippedDataset>;

/// Owns the connectors for one process and runs acquisitions with them.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use geostitch_core::test_support::{StubBoundaryConnector, StubSourceConnector, buildings_inside, square_collection};
/// use geostitch_core::{DatasetKind, RunStatus};
/// use geostitch_data::acquisition::{AcquisitionOrchestrator, AcquisitionRequest};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let orchestrator = AcquisitionOrchestrator::new(Arc::new(StubBoundaryConnector::with_collection(
///     square_collection(1),
/// )))
/// .with_connector(Arc::new(StubSourceConnector::with_collection(
///     DatasetKind::Buildings,
///     buildings_inside(3),
/// )));
///
/// let request = AcquisitionRequest::new("Pankow", [DatasetKind::Buildings]);
/// let outcome = orchestrator.run(&request).await.unwrap();
/// assert_eq!(outcome.status, RunStatus::Succeeded);
/// assert_eq!(outcome.results.len(), 2);
/// # });
/// ```
#[derive(Clone)]
pub struct AcquisitionOrchestrator {
    boundary: Arc<dyn BoundaryConnector>,
    connectors: BTreeMap<DatasetKind, Arc<dyn SourceConnector>>,
    config: OrchestratorConfig,
}

impl fmt::Debug for AcquisitionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquisitionOrchestrator")
            .field("boundary", &"<dyn BoundaryConnector>")
            .field("connectors", &self.connectors.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl AcquisitionOrchestrator {
    /// Create an orchestrator with only a boundary connector.
    #[must_use]
    pub fn new(boundary: Arc<dyn BoundaryConnector>) -> Self {
        Self {
            boundary,
            connectors: BTreeMap::new(),
            config: OrchestratorConfig::default(),
        }
    }

    /// Register `connector` for its kind, replacing any earlier one.
    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn SourceConnector>) -> Self {
        let kind = connector.kind();
        if kind.is_boundary() {
            warn!("ignoring source connector registered for the boundary kind");
            return self;
        }
        self.connectors.insert(kind, connector);
        self
    }

    /// Replace the run settings.
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Kinds with a registered source connector.
    pub fn registered_kinds(&self) -> impl Iterator<Item = DatasetKind> + '_ {
        self.connectors.keys().copied()
    }

    /// Run an acquisition to completion.
    ///
    /// # Errors
    ///
    /// See [`Self::run_with_cancellation`].
    pub async fn run(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<AcquisitionOutcome, AcquisitionError> {
        self.run_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Run an acquisition that stops early when `token` is cancelled.
    ///
    /// Cancellation and the configured run timeout abort every outstanding
    /// fetch; nothing fetched so far is returned.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::BoundaryUnavailable`] when the boundary
    /// fetch fails, [`AcquisitionError::Cancelled`] when `token` fires and
    /// [`AcquisitionError::TimedOut`] when the run budget is exceeded.
    pub async fn run_with_cancellation(
        &self,
        request: &AcquisitionRequest,
        token: CancellationToken,
    ) -> Result<AcquisitionOutcome, AcquisitionError> {
        let acquisition = self.acquire(request);
        let bounded = async {
            match self.config.run_timeout {
                Some(limit) => tokio::time::timeout(limit, acquisition)
                    .await
                    .unwrap_or_else(|_| Err(AcquisitionError::TimedOut { after: limit })),
                None => acquisition.await,
            }
        };
        let result = tokio::select! {
            biased;
            () = token.cancelled() => Err(AcquisitionError::Cancelled),
            result = bounded => result,
        };
        if let Err(err) = &result {
            error!("acquisition for {} failed: {err}", request.area_name);
            enter(&request.area_name, RunPhase::Finished(RunStatus::Failed));
        }
        result
    }

    async fn acquire(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<AcquisitionOutcome, AcquisitionError> {
        let area_name = request.area_name.as_str();
        let plan = request.plan();
        enter(area_name, RunPhase::Started);

        enter(area_name, RunPhase::FetchingBoundary);
        let boundary = self.fetch_boundary(area_name).await?;
        let area = AreaOfInterest::from_boundary_collection(area_name, &boundary.collection)
            .map(Arc::new)
            .map_err(|err| AcquisitionError::BoundaryUnavailable {
                area: area_name.to_owned(),
                source: ConnectorError::decode(err),
            })?;

        enter(area_name, RunPhase::FetchingOptional);
        let mut outcomes = self.fetch_optional(&plan, &area).await;

        let mut results = vec![boundary];
        let mut skipped = Vec::new();
        for kind in plan.into_iter().filter(|kind| !kind.is_boundary()) {
            let outcome = outcomes.remove(&kind).unwrap_or_else(|| {
                Err(SkippedDataset {
                    kind,
                    reason: SkipReason::TaskFailed {
                        message: "fetch task did not complete".to_owned(),
                    },
                    stats: None,
                })
            });
            match outcome {
                Ok(result) => results.push(result),
                Err(skip) => skipped.push(skip),
            }
        }

        let status = if skipped.is_empty() {
            RunStatus::Succeeded
        } else {
            RunStatus::PartialSuccess
        };
        enter(area_name, RunPhase::Finished(status));
        info!(
            "acquisition for {area_name}: {} dataset(s) fetched, {} skipped",
            results.len(),
            skipped.len()
        );
        Ok(AcquisitionOutcome {
            area: Arc::unwrap_or_clone(area),
            status,
            results,
            skipped,
        })
    }

    async fn fetch_boundary(&self, area_name: &str) -> Result<RawDatasetResult, AcquisitionError> {
        let requested_at = SystemTime::now();
        let started = Instant::now();
        let collection = self
            .boundary
            .fetch_boundary(area_name)
            .await
            .map_err(|source| AcquisitionError::BoundaryUnavailable {
                area: area_name.to_owned(),
                source,
            })?;
        let stats = RuntimeStats::success(started.elapsed(), &collection, requested_at);
        Ok(RawDatasetResult::new(
            DatasetKind::Boundary,
            collection,
            stats,
        ))
    }

    /// One task per planned kind; tasks are aborted if this future is dropped.
    async fn fetch_optional(
        &self,
        plan: &[DatasetKind],
        area: &Arc<AreaOfInterest>,
    ) -> BTreeMap<DatasetKind, TaskOutcome> {
        let mut outcomes = BTreeMap::new();
        let mut tasks = JoinSet::new();
        for &kind in plan.iter().filter(|kind| !kind.is_boundary()) {
            let Some(connector) = self.connectors.get(&kind) else {
                warn!("{kind}: no connector registered, skipping");
                outcomes.insert(
                    kind,
                    Err(SkippedDataset {
                        kind,
                        reason: SkipReason::NoConnector,
                        stats: None,
                    }),
                );
                continue;
            };
            tasks.spawn(fetch_one(kind, Arc::clone(connector), Arc::clone(area)));
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((kind, outcome)) => {
                    outcomes.insert(kind, outcome);
                }
                Err(err) => error!("fetch task ended abnormally: {err}"),
            }
        }
        outcomes
    }

    /// Probe every connector concurrently.
    pub async fn check_health(&self) -> BTreeMap<DatasetKind, bool> {
        let sources = join_all(
            self.connectors
                .iter()
                .map(|(kind, connector)| async move { (*kind, connector.health_check().await) }),
        );
        let (boundary, sources) = tokio::join!(self.boundary.health_check(), sources);
        let mut health: BTreeMap<_, _> = sources.into_iter().collect();
        health.insert(DatasetKind::Boundary, boundary);
        health
    }
}

async fn fetch_one(
    kind: DatasetKind,
    connector: Arc<dyn SourceConnector>,
    area: Arc<AreaOfInterest>,
) -> (DatasetKind, TaskOutcome) {
    let requested_at = SystemTime::now();
    let started = Instant::now();
    let fetched = AssertUnwindSafe(connector.fetch(&area)).catch_unwind().await;
    let latency = started.elapsed();
    let outcome = match fetched {
        Ok(Ok(collection)) => {
            let stats = RuntimeStats::success(latency, &collection, requested_at);
            info!(
                "{kind}: {} feature(s) in {latency:?}",
                stats.feature_count
            );
            Ok(RawDatasetResult::new(kind, collection, stats))
        }
        Ok(Err(err)) => {
            error!("{kind}: skipped after {latency:?}: {err}");
            Err(SkippedDataset {
                kind,
                stats: Some(RuntimeStats::failed(latency, err.to_string(), requested_at)),
                reason: SkipReason::Connector(err),
            })
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("{kind}: fetch panicked: {message}");
            Err(SkippedDataset {
                kind,
                stats: Some(RuntimeStats::failed(latency, message.clone(), requested_at)),
                reason: SkipReason::TaskFailed { message },
            })
        }
    };
    (kind, outcome)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "fetch panicked".to_owned())
}
