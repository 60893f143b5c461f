//! Wiring of the production connector set.

use std::sync::Arc;
use std::time::Duration;

use geostitch_core::DatasetKind;
use thiserror::Error;

use crate::acquisition::{AcquisitionOrchestrator, OrchestratorConfig};
use crate::http::{
    ClientBuildError, HttpClientConfig, RateLimitError, RateLimiter, ResilientClient, RetryPolicy,
};
use crate::overpass::{DEFAULT_OVERPASS_RPS, DEFAULT_OVERPASS_URL, OverpassConnector};
use crate::wfs::{DEFAULT_WFS_BASE_URL, WfsBoundaryConnector, WfsClient, WfsLayerConnector};

/// The cycling network layer is large and served slowly.
const CYCLING_TIMEOUT: Duration = Duration::from_secs(60);

/// Endpoints and transport settings for the production connectors.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Geoportal WFS root.
    pub wfs_base_url: String,
    /// Overpass interpreter endpoint.
    pub overpass_url: String,
    /// Overpass request ceiling.
    pub overpass_rps: f64,
    /// Transport settings shared by every connector.
    pub http: HttpClientConfig,
    /// Retry policy shared by every connector.
    pub retry: RetryPolicy,
    /// Run-level settings.
    pub orchestrator: OrchestratorConfig,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            wfs_base_url: DEFAULT_WFS_BASE_URL.to_owned(),
            overpass_url: DEFAULT_OVERPASS_URL.to_owned(),
            overpass_rps: DEFAULT_OVERPASS_RPS,
            http: HttpClientConfig::default(),
            retry: RetryPolicy::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

/// Errors raised while wiring the production connectors.
#[derive(Debug, Error)]
pub enum SourceBuildError {
    /// The HTTP client could not be built.
    #[error(transparent)]
    Client(#[from] ClientBuildError),
    /// An endpoint was not an absolute URL.
    #[error("invalid endpoint {url:?}: {source}")]
    Endpoint {
        /// Offending value.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// The Overpass rate was unusable.
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
}

/// Orchestrator with the WFS boundary connector, a WFS layer connector for
/// every layer-backed kind and the Overpass transit connector.
///
/// # Errors
///
/// Returns [`SourceBuildError`] for unusable endpoints, rates or TLS setup.
pub fn build_orchestrator(
    settings: &SourceSettings,
) -> Result<AcquisitionOrchestrator, SourceBuildError> {
    let endpoint_error = |url: &str| {
        let url = url.to_owned();
        move |source| SourceBuildError::Endpoint { url, source }
    };
    let http = ResilientClient::new(settings.http.clone(), settings.retry)?;
    let wfs = WfsClient::new(http.clone(), &settings.wfs_base_url)
        .map_err(endpoint_error(&settings.wfs_base_url))?;
    let slow_http = ResilientClient::new(
        settings
            .http
            .clone()
            .with_timeout(settings.http.timeout.max(CYCLING_TIMEOUT)),
        settings.retry,
    )?;
    let slow_wfs = WfsClient::new(slow_http, &settings.wfs_base_url)
        .map_err(endpoint_error(&settings.wfs_base_url))?;

    let limiter = Arc::new(RateLimiter::per_second(settings.overpass_rps)?);
    let overpass = OverpassConnector::new(http, &settings.overpass_url, limiter)
        .map_err(endpoint_error(&settings.overpass_url))?;

    let mut orchestrator =
        AcquisitionOrchestrator::new(Arc::new(WfsBoundaryConnector::new(wfs.clone())))
            .with_config(settings.orchestrator)
            .with_connector(Arc::new(overpass));
    for kind in DatasetKind::ALL {
        let client = if kind == DatasetKind::CyclingNetwork {
            slow_wfs.clone()
        } else {
            wfs.clone()
        };
        if let Some(connector) = WfsLayerConnector::for_kind(client, kind) {
            orchestrator = orchestrator.with_connector(Arc::new(connector));
        }
    }
    Ok(orchestrator)
}
