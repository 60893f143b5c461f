//! District boundary lookup by name.

use async_trait::async_trait;
use geostitch_core::{BoundaryConnector, ConnectorError, FeatureCollection};
use log::info;

use super::{WfsClient, WfsFilter};

const SERVICE: &str = "alkis_bezirke";
const TYPE_NAME: &str = "alkis_bezirke:bezirksgrenzen";

/// Boundary connector backed by the ALKIS district layer.
///
/// Districts are matched on their `namgem` attribute. An unknown name yields
/// [`ConnectorError::NotFound`].
#[derive(Debug, Clone)]
pub struct WfsBoundaryConnector {
    client: WfsClient,
}

impl WfsBoundaryConnector {
    /// Create a connector using `client`.
    #[must_use]
    pub const fn new(client: WfsClient) -> Self {
        Self { client }
    }
}

/// CQL equality filter on the district name, quotes doubled.
fn name_filter(area_name: &str) -> String {
    format!("namgem='{}'", area_name.replace('\'', "''"))
}

#[async_trait]
impl BoundaryConnector for WfsBoundaryConnector {
    async fn fetch_boundary(&self, area_name: &str) -> Result<FeatureCollection, ConnectorError> {
        let filter = WfsFilter::Cql(name_filter(area_name));
        let collection = self
            .client
            .get_features(SERVICE, TYPE_NAME, &filter)
            .await?;
        if collection.is_empty() {
            return Err(ConnectorError::NotFound {
                area: area_name.to_owned(),
            });
        }
        info!(
            "fetched {} boundary feature(s) for {area_name}",
            collection.len()
        );
        Ok(collection)
    }

    async fn health_check(&self) -> bool {
        self.client.capabilities_ok(SERVICE).await
    }
}
