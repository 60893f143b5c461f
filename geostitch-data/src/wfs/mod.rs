//! OGC Web Feature Service connectors for the Berlin geoportal.
//!
//! Every layer is served from `{base_url}/{service}` and queried with WFS
//! 2.0.0 `GetFeature` requests that ask for GeoJSON in the target CRS.
//! Boundaries are selected by a CQL name filter; every other layer by a
//! bounding box around the area.

mod boundary;
mod layer;

pub use boundary::WfsBoundaryConnector;
pub use layer::{WfsLayer, WfsLayerConnector, layers_for};

use geo::Rect;
use geostitch_core::geojson::parse_feature_collection;
use geostitch_core::{ConnectorError, FeatureCollection, TARGET_CRS};
use log::{debug, warn};
use url::Url;

use crate::http::{OutboundRequest, ResilientClient};

/// Default geoportal WFS root.
pub const DEFAULT_WFS_BASE_URL: &str = "https://gdi.berlin.de/services/wfs";

/// Buffer added around the area extent for `BBOX` queries, in metres.
pub const BBOX_BUFFER_METRES: f64 = 100.0;

/// Selection applied to a `GetFeature` request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WfsFilter {
    /// `CQL_FILTER` expression.
    Cql(String),
    /// `BBOX` in the target CRS.
    BBox(Rect<f64>),
}

/// Shared WFS transport: the geoportal root plus a resilient client.
#[derive(Debug, Clone)]
pub struct WfsClient {
    http: ResilientClient,
    base_url: Url,
}

impl WfsClient {
    /// Create a client for the WFS root at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] when `base_url` is not an absolute URL.
    pub fn new(http: ResilientClient, base_url: &str) -> Result<Self, url::ParseError> {
        // A trailing slash makes `Url::join` append the service segment.
        let root = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        Ok(Self {
            http,
            base_url: root,
        })
    }

    /// Root URL with a trailing slash.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn service_url(&self, service: &str) -> Result<Url, ConnectorError> {
        self.base_url
            .join(service)
            .map_err(|err| ConnectorError::Other {
                url: self.base_url.to_string(),
                message: format!("invalid WFS service {service:?}: {err}"),
            })
    }

    /// Fetch one layer and normalise it into the target CRS.
    pub(crate) async fn get_features(
        &self,
        service: &str,
        type_name: &str,
        filter: &WfsFilter,
    ) -> Result<FeatureCollection, ConnectorError> {
        let mut request = OutboundRequest::get(self.service_url(service)?)
            .with_query("SERVICE", "WFS")
            .with_query("VERSION", "2.0.0")
            .with_query("REQUEST", "GetFeature")
            .with_query("OUTPUTFORMAT", "application/json")
            .with_query("SRSNAME", TARGET_CRS.to_string())
            .with_query("TYPENAMES", type_name);
        request = match filter {
            WfsFilter::Cql(expression) => request.with_query("CQL_FILTER", expression.as_str()),
            WfsFilter::BBox(rect) => request.with_query(
                "BBOX",
                format!(
                    "{},{},{},{},{TARGET_CRS}",
                    rect.min().x,
                    rect.min().y,
                    rect.max().x,
                    rect.max().y
                ),
            ),
        };
        let body = self.http.execute(&request).await?;
        let collection = parse_feature_collection(&body).map_err(ConnectorError::decode)?;
        debug!("{type_name}: decoded {} features", collection.len());
        collection
            .into_crs(TARGET_CRS)
            .map_err(ConnectorError::decode)
    }

    /// `GetCapabilities` probe for one service.
    pub(crate) async fn capabilities_ok(&self, service: &str) -> bool {
        let Ok(url) = self.service_url(service) else {
            return false;
        };
        let request = OutboundRequest::get(url)
            .with_query("SERVICE", "WFS")
            .with_query("REQUEST", "GetCapabilities");
        match self.http.execute(&request).await {
            Ok(body) => String::from_utf8_lossy(&body).contains("WFS_Capabilities"),
            Err(err) => {
                warn!("WFS health check for {service} failed: {err}");
                false
            }
        }
    }
}
