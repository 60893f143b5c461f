//! Data acquisition for the geostitch pipeline.
//!
//! Responsibilities:
//! - Execute outbound HTTP calls with bounded retries and typed errors.
//! - Rate-limit calls to services with a published request ceiling.
//! - Provide WFS and Overpass implementations of the connector traits.
//! - Orchestrate boundary-first, failure-isolated concurrent fetches.
//!
//! Boundaries:
//! - Do not encode harmonization rules (live in `geostitch-harmonize`).
//! - Keep wire formats inside the connector modules.
//!
//! Invariants:
//! - No global mutable state; connectors are injected into the orchestrator.
//! - Connectors return features in the target CRS.

pub mod acquisition;
pub mod http;
pub mod overpass;
mod sources;
pub mod wfs;

pub use acquisition::{
    AcquisitionError, AcquisitionOrchestrator, AcquisitionOutcome, AcquisitionRequest,
    OrchestratorConfig,
};
pub use sources::{SourceBuildError, SourceSettings, build_orchestrator};
