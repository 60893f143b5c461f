//! Interfaces implemented by source connectors.
//!
//! Connectors are injected into the acquisition orchestrator as trait
//! objects, so test doubles and real HTTP connectors are interchangeable.
//! Both traits are `Send + Sync` because fetches run on a multi-threaded
//! runtime.

mod error;

pub use error::{ConnectorError, ConnectorErrorClass};

use async_trait::async_trait;

use crate::area::AreaOfInterest;
use crate::feature::FeatureCollection;
use crate::kind::DatasetKind;

/// Fetches the boundary of a named area.
#[async_trait]
pub trait BoundaryConnector: Send + Sync {
    /// Fetch the boundary polygons for `area_name`.
    ///
    /// Implementations return [`ConnectorError::NotFound`] when the source
    /// knows no area of that name.
    async fn fetch_boundary(&self, area_name: &str) -> Result<FeatureCollection, ConnectorError>;

    /// Probe the upstream service. Never fails; unreachable is `false`.
    async fn health_check(&self) -> bool;
}

/// Fetches one optional dataset kind for an area.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use geostitch_core::{
///     AreaOfInterest, ConnectorError, DatasetKind, FeatureCollection, SourceConnector, TARGET_CRS,
/// };
///
/// struct Nothing;
///
/// #[async_trait]
/// impl SourceConnector for Nothing {
///     fn kind(&self) -> DatasetKind {
///         DatasetKind::Buildings
///     }
///
///     async fn fetch(&self, _area: &AreaOfInterest) -> Result<FeatureCollection, ConnectorError> {
///         Ok(FeatureCollection::empty(TARGET_CRS))
///     }
///
///     async fn health_check(&self) -> bool {
///         true
///     }
/// }
/// ```
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Kind served by this connector.
    fn kind(&self) -> DatasetKind;

    /// Fetch features inside `area`.
    ///
    /// Implementations return features in the target CRS, pre-filtered by a
    /// buffered bounding box and clipped to the boundary where possible. An
    /// area with no matching features yields an empty collection, not an
    /// error.
    async fn fetch(&self, area: &AreaOfInterest) -> Result<FeatureCollection, ConnectorError>;

    /// Probe the upstream service. Never fails; unreachable is `false`.
    async fn health_check(&self) -> bool;
}
