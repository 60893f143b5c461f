//! Bounding-box queries against thematic WFS layers.

use async_trait::async_trait;
use geostitch_core::spatial::{bbox_prefilter, clip_or_fallback};
use geostitch_core::{
    AreaOfInterest, ConnectorError, DatasetKind, FeatureCollection, SourceConnector, TARGET_CRS,
};
use log::{info, warn};
use serde_json::Value;

use super::{BBOX_BUFFER_METRES, WfsClient, WfsFilter};

/// One WFS feature type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WfsLayer {
    /// Service path segment below the WFS root.
    pub service: &'static str,
    /// Qualified feature type name.
    pub type_name: &'static str,
    /// Attribute stamped on every feature of this layer.
    pub label: Option<(&'static str, &'static str)>,
}

impl WfsLayer {
    const fn plain(service: &'static str, type_name: &'static str) -> Self {
        Self {
            service,
            type_name,
            label: None,
        }
    }

    const fn floors(type_name: &'static str, range: &'static str) -> Self {
        Self {
            service: "gebaeude_geschosse",
            type_name,
            label: Some(("floor_range", range)),
        }
    }
}

const BUILDINGS: &[WfsLayer] = &[WfsLayer::plain("alkis_gebaeude", "alkis_gebaeude:gebaeude")];
const CYCLING_NETWORK: &[WfsLayer] = &[WfsLayer::plain(
    "radverkehrsnetz",
    "radverkehrsnetz:radverkehrsnetz",
)];
const STREET_NETWORK: &[WfsLayer] = &[WfsLayer::plain(
    "detailnetz",
    "detailnetz:c_strassenabschnitte",
)];
const LOCALITIES: &[WfsLayer] = &[WfsLayer::plain("alkis_ortsteile", "alkis_ortsteile:ortsteile")];
const POPULATION_DENSITY: &[WfsLayer] = &[WfsLayer::plain(
    "ua_einwohnerdichte_2024",
    "ua_einwohnerdichte_2024:ua_einwohnerdichte_2024",
)];
const BUILDING_FLOORS: &[WfsLayer] = &[
    WfsLayer::floors("gebaeude_geschosse:a_geschosszahl_mehr_10", "more_than_10"),
    WfsLayer::floors("gebaeude_geschosse:b_geschosszahl_7_10", "7_to_10"),
    WfsLayer::floors("gebaeude_geschosse:c_geschosszahl_5_6", "5_to_6"),
    WfsLayer::floors("gebaeude_geschosse:d_geschosszahl_3_4", "3_to_4"),
    WfsLayer::floors("gebaeude_geschosse:e_geschosszahl_1_2", "1_to_2"),
    WfsLayer::floors("gebaeude_geschosse:f_geschosszahl_unter_1", "under_1"),
];

/// Layers serving `kind`, or `None` when the kind is not a WFS layer.
#[must_use]
pub const fn layers_for(kind: DatasetKind) -> Option<&'static [WfsLayer]> {
    match kind {
        DatasetKind::Buildings => Some(BUILDINGS),
        DatasetKind::CyclingNetwork => Some(CYCLING_NETWORK),
        DatasetKind::StreetNetwork => Some(STREET_NETWORK),
        DatasetKind::Localities => Some(LOCALITIES),
        DatasetKind::PopulationDensity => Some(POPULATION_DENSITY),
        DatasetKind::BuildingFloors => Some(BUILDING_FLOORS),
        DatasetKind::Boundary | DatasetKind::TransitStops => None,
    }
}

/// [`SourceConnector`] for one or more WFS layers of the same kind.
///
/// Layers are fetched with a `BBOX` around the area, concatenated, filtered
/// by the buffered extent and clipped to the boundary. For multi-layer kinds
/// a failing layer is logged and skipped; the fetch fails only when every
/// layer does.
#[derive(Debug, Clone)]
pub struct WfsLayerConnector {
    client: WfsClient,
    kind: DatasetKind,
    layers: &'static [WfsLayer],
}

impl WfsLayerConnector {
    /// Connector for `kind`, or `None` when no WFS layer serves it.
    #[must_use]
    pub fn for_kind(client: WfsClient, kind: DatasetKind) -> Option<Self> {
        layers_for(kind).map(|layers| Self {
            client,
            kind,
            layers,
        })
    }

    /// Layers queried by this connector.
    #[must_use]
    pub const fn layers(&self) -> &'static [WfsLayer] {
        self.layers
    }
}

#[async_trait]
impl SourceConnector for WfsLayerConnector {
    fn kind(&self) -> DatasetKind {
        self.kind
    }

    async fn fetch(&self, area: &AreaOfInterest) -> Result<FeatureCollection, ConnectorError> {
        let projected = area.to_crs(TARGET_CRS).map_err(ConnectorError::decode)?;
        let bbox = projected.buffered_bounds(BBOX_BUFFER_METRES);
        let filter = WfsFilter::BBox(bbox);

        let mut features = Vec::new();
        let mut failures = 0;
        let mut last_error = None;
        for layer in self.layers {
            match self
                .client
                .get_features(layer.service, layer.type_name, &filter)
                .await
            {
                Ok(collection) => {
                    features.extend(collection.features.into_iter().map(|feature| {
                        match layer.label {
                            Some((key, value)) => feature.with_attribute(key, Value::from(value)),
                            None => feature,
                        }
                    }));
                }
                Err(err) => {
                    warn!("{}: layer {} failed: {err}", self.kind, layer.type_name);
                    failures += 1;
                    last_error = Some(err);
                }
            }
        }
        if failures == self.layers.len()
            && let Some(err) = last_error
        {
            return Err(err);
        }

        let collection = bbox_prefilter(FeatureCollection::new(features, Some(TARGET_CRS)), bbox);
        let clipped = clip_or_fallback(collection, projected.boundary(), self.kind.as_str());
        info!(
            "{}: {} feature(s) for {}",
            self.kind,
            clipped.len(),
            projected.name()
        );
        Ok(clipped)
    }

    async fn health_check(&self) -> bool {
        match self.layers.first() {
            Some(layer) => self.client.capabilities_ok(layer.service).await,
            None => false,
        }
    }
}
