//! Facade crate for the geostitch geodata aggregation pipeline.
//!
//! Re-exports the public surface of the member crates and adds
//! [`Pipeline`], which runs acquisition and harmonization end to end.

#![forbid(unsafe_code)]

mod run;

pub use geostitch_core::{
    AreaOfInterest, BoundaryConnector, ConnectorError, ConnectorErrorClass, Crs, DatasetKind,
    DatasetMetadata, Feature, FeatureCollection, RawDatasetResult, RunStatus, RuntimeStats,
    SkipReason, SkippedDataset, SourceConnector, SourceSystem, TARGET_CRS,
};
pub use geostitch_data::{
    AcquisitionError, AcquisitionOrchestrator, AcquisitionOutcome, AcquisitionRequest,
    OrchestratorConfig, SourceBuildError, SourceSettings, build_orchestrator,
};
pub use geostitch_harmonize::{
    GeometryRepair, HarmonizeConfig, HarmonizeError, Harmonization, HarmonizedCollection,
    HarmonizedFeature, Harmonizer, OverlayRepair, QualityReport,
};
pub use run::{Pipeline, RunError, RunReport};
