//! Stub pipelines and fixtures shared by the CLI tests.

use super::*;
use crate::fetch::{FetchArgs, FetchConfig, PipelineBuilder};
use geostitch::{
    AcquisitionOrchestrator, ConnectorError, DatasetKind, HarmonizeConfig, Harmonizer, Pipeline,
};
use geostitch_core::test_support::{
    StubBoundaryConnector, StubSourceConnector, buildings_inside, square_collection,
};
use serde_json::Value;
use std::sync::Arc;

/// Builds a pipeline over stub connectors instead of the live services.
#[derive(Debug, Clone)]
pub(super) struct StubPipelineBuilder {
    boundary: StubBoundaryConnector,
    optional: Vec<StubSourceConnector>,
}

impl StubPipelineBuilder {
    pub(super) fn with_boundary() -> Self {
        Self {
            boundary: StubBoundaryConnector::with_collection(square_collection(1)),
            optional: Vec::new(),
        }
    }

    pub(super) fn with_rejected_boundary() -> Self {
        Self {
            boundary: StubBoundaryConnector::with_error(ConnectorError::InvalidParameter {
                url: "https://gdi.berlin.de/services/wfs/alkis_bezirke".to_owned(),
                status: 400,
                message: "invalid CQL_FILTER".to_owned(),
            }),
            optional: Vec::new(),
        }
    }

    pub(super) fn with_buildings(mut self, count: usize) -> Self {
        self.optional.push(StubSourceConnector::with_collection(
            DatasetKind::Buildings,
            buildings_inside(count),
        ));
        self
    }

    pub(super) fn with_unavailable_transit(mut self) -> Self {
        self.optional.push(StubSourceConnector::with_error(
            DatasetKind::TransitStops,
            ConnectorError::ServiceUnavailable {
                url: "https://overpass-api.de/api/interpreter".to_owned(),
                reason: "HTTP 503".to_owned(),
            },
        ));
        self
    }
}

impl PipelineBuilder for StubPipelineBuilder {
    fn build(&self, _config: &FetchConfig) -> Result<Pipeline, CliError> {
        let orchestrator = self.optional.iter().cloned().fold(
            AcquisitionOrchestrator::new(Arc::new(self.boundary.clone())),
            |acc, stub| acc.with_connector(Arc::new(stub)),
        );
        Ok(Pipeline::new(
            orchestrator,
            Harmonizer::new(HarmonizeConfig::default()),
        ))
    }
}

/// Resolved configuration for Pankow and the given kinds list.
pub(super) fn pankow_config(kinds: &str) -> FetchConfig {
    FetchConfig::try_from(FetchArgs {
        area: Some("Pankow".to_owned()),
        kinds: Some(kinds.to_owned()),
        ..FetchArgs::default()
    })
    .expect("config should build")
}

pub(super) fn parse_output(buffer: &[u8]) -> Value {
    serde_json::from_slice(buffer).expect("output should be JSON")
}

/// Length of the GeoJSON feature array in a fetch result.
pub(super) fn feature_count(output: &Value) -> usize {
    output["features"]["features"]
        .as_array()
        .map_or(0, Vec::len)
}
