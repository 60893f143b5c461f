//! Core domain types for the geostitch acquisition and harmonization
//! pipeline.
//!
//! Responsibilities:
//! - Model areas, dataset kinds, features and per-fetch statistics.
//! - Reproject between the coordinate reference systems sources publish in.
//! - Clip feature collections to an area boundary.
//! - Define the connector traits and their error taxonomy.
//!
//! Boundaries:
//! - No network I/O (lives in `geostitch-data`).
//! - No quality scoring (lives in `geostitch-harmonize`).

pub mod area;
pub mod connector;
pub mod crs;
pub mod dataset;
pub mod feature;
pub mod geojson;
pub mod kind;
pub mod metadata;
pub mod spatial;
pub mod stats;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use area::{AreaError, AreaOfInterest};
pub use connector::{BoundaryConnector, ConnectorError, ConnectorErrorClass, SourceConnector};
pub use crs::{Crs, CrsError, TARGET_CRS, Transformer};
pub use dataset::{RawDatasetResult, RunStatus, SkipReason, SkippedDataset};
pub use feature::{Attributes, Feature, FeatureCollection};
pub use geojson::GeoJsonError;
pub use kind::{DatasetKind, ParseDatasetKindError, SourceSystem};
pub use metadata::DatasetMetadata;
pub use spatial::ClipError;
pub use stats::{Extent, FetchStatus, RuntimeStats};
