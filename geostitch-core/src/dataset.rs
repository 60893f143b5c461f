//! Raw per-kind fetch results and the records of kinds that were skipped.

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::connector::ConnectorError;
use crate::feature::FeatureCollection;
use crate::kind::{DatasetKind, SourceSystem};
use crate::stats::RuntimeStats;

/// One successfully fetched dataset, before harmonization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDatasetResult {
    /// Requested kind.
    pub kind: DatasetKind,
    /// Publishing system.
    pub source: SourceSystem,
    /// Fetched features and their CRS.
    pub collection: FeatureCollection,
    /// Fetch statistics.
    pub stats: RuntimeStats,
}

impl RawDatasetResult {
    /// Build a result, deriving the source system from `kind`.
    #[must_use]
    pub const fn new(kind: DatasetKind, collection: FeatureCollection, stats: RuntimeStats) -> Self {
        Self {
            kind,
            source: kind.source_system(),
            collection,
            stats,
        }
    }
}

/// Why an optional dataset was left out of a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// The connector returned an error.
    #[error("{0}")]
    Connector(#[from] ConnectorError),
    /// No connector was registered for the kind.
    #[error("no connector registered")]
    NoConnector,
    /// The fetch task panicked or was aborted.
    #[error("fetch task failed: {message}")]
    TaskFailed {
        /// Panic payload or join error text.
        message: String,
    },
}

/// A requested kind excluded from the result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedDataset {
    /// Skipped kind.
    pub kind: DatasetKind,
    /// Reason for skipping.
    #[serde(serialize_with = "display")]
    pub reason: SkipReason,
    /// Fetch statistics when the connector ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<RuntimeStats>,
}

fn display<S: Serializer>(reason: &SkipReason, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(reason)
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every requested kind was fetched.
    Succeeded,
    /// The boundary was fetched but at least one optional kind was skipped.
    PartialSuccess,
    /// The boundary could not be fetched; nothing was returned.
    Failed,
}
