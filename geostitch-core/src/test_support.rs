//! Deterministic connector doubles and geometry fixtures.
//!
//! [`StubBoundaryConnector`] and [`StubSourceConnector`] return
//! pre-configured responses without any network access, optionally after a
//! delay so that cancellation and timeouts can be exercised.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use geo::{Polygon, polygon};

use crate::{
    AreaOfInterest, BoundaryConnector, ConnectorError, DatasetKind, Feature, FeatureCollection,
    SourceConnector, TARGET_CRS,
};

#[derive(Debug, Clone)]
enum StubResponse {
    Collection(FeatureCollection),
    Error(ConnectorError),
    Panic(&'static str),
}

impl StubResponse {
    fn resolve(&self) -> Result<FeatureCollection, ConnectorError> {
        match self {
            Self::Collection(collection) => Ok(collection.clone()),
            Self::Error(err) => Err(err.clone()),
            Self::Panic(message) => panic!("{message}"),
        }
    }
}

/// Stub [`BoundaryConnector`].
#[derive(Debug, Clone)]
pub struct StubBoundaryConnector {
    response: StubResponse,
    healthy: bool,
}

impl StubBoundaryConnector {
    /// Return `collection` for every area name.
    #[must_use]
    pub const fn with_collection(collection: FeatureCollection) -> Self {
        Self {
            response: StubResponse::Collection(collection),
            healthy: true,
        }
    }

    /// Fail every fetch with `error`.
    #[must_use]
    pub const fn with_error(error: ConnectorError) -> Self {
        Self {
            response: StubResponse::Error(error),
            healthy: false,
        }
    }
}

#[async_trait]
impl BoundaryConnector for StubBoundaryConnector {
    async fn fetch_boundary(&self, _area_name: &str) -> Result<FeatureCollection, ConnectorError> {
        self.response.resolve()
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}

/// Stub [`SourceConnector`] for one kind.
#[derive(Debug, Clone)]
pub struct StubSourceConnector {
    kind: DatasetKind,
    response: StubResponse,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StubSourceConnector {
    /// Return `collection` for every area.
    #[must_use]
    pub fn with_collection(kind: DatasetKind, collection: FeatureCollection) -> Self {
        Self::new(kind, StubResponse::Collection(collection))
    }

    /// Fail every fetch with `error`.
    #[must_use]
    pub fn with_error(kind: DatasetKind, error: ConnectorError) -> Self {
        Self::new(kind, StubResponse::Error(error))
    }

    /// Panic inside every fetch.
    #[must_use]
    pub fn panicking(kind: DatasetKind, message: &'static str) -> Self {
        Self::new(kind, StubResponse::Panic(message))
    }

    /// Sleep for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of completed or in-flight fetches, shared across clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn new(kind: DatasetKind, response: StubResponse) -> Self {
        Self {
            kind,
            response,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SourceConnector for StubSourceConnector {
    fn kind(&self) -> DatasetKind {
        self.kind
    }

    async fn fetch(&self, _area: &AreaOfInterest) -> Result<FeatureCollection, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.resolve()
    }

    async fn health_check(&self) -> bool {
        matches!(self.response, StubResponse::Collection(_))
    }
}

/// Axis-aligned square with its lower-left corner at `(min_x, min_y)`.
#[must_use]
pub fn square(min_x: f64, min_y: f64, size: f64) -> Polygon<f64> {
    polygon![
        (x: min_x, y: min_y),
        (x: min_x + size, y: min_y),
        (x: min_x + size, y: min_y + size),
        (x: min_x, y: min_y + size),
        (x: min_x, y: min_y),
    ]
}

/// Self-intersecting polygon: a 4x4 square with a zero-width spike.
#[must_use]
pub fn spike_polygon(min_x: f64, min_y: f64) -> Polygon<f64> {
    polygon![
        (x: min_x, y: min_y),
        (x: min_x + 4.0, y: min_y),
        (x: min_x + 4.0, y: min_y + 4.0),
        (x: min_x + 2.0, y: min_y + 4.0),
        (x: min_x + 2.0, y: min_y + 6.0),
        (x: min_x + 2.0, y: min_y + 4.0),
        (x: min_x, y: min_y + 4.0),
        (x: min_x, y: min_y),
    ]
}

/// Origin of the test boundary in the target CRS.
pub const BOUNDARY_ORIGIN: (f64, f64) = (390_000.0, 5_820_000.0);
/// Side length of the test boundary in metres.
pub const BOUNDARY_SIZE: f64 = 1_000.0;

/// A boundary collection of `count` adjacent squares in the target CRS.
#[must_use]
pub fn square_collection(count: usize) -> FeatureCollection {
    let (x, y) = BOUNDARY_ORIGIN;
    let mut offset = 0.0;
    let features = (0..count)
        .map(|_| {
            let feature = Feature::from_geometry(square(x + offset, y, BOUNDARY_SIZE))
                .with_attribute("namgem", "Pankow");
            offset += BOUNDARY_SIZE;
            feature
        })
        .collect();
    FeatureCollection::new(features, Some(TARGET_CRS))
}

/// `count` small squares inside the first boundary square.
#[must_use]
pub fn buildings_inside(count: usize) -> FeatureCollection {
    let (x, y) = BOUNDARY_ORIGIN;
    let mut offset = 10.0;
    let features = (0..count)
        .map(|_| {
            let feature = Feature::from_geometry(square(x + offset, y + 10.0, 20.0))
                .with_attribute("gebaeudefunktion", "Wohnhaus");
            offset += 30.0;
            feature
        })
        .collect();
    FeatureCollection::new(features, Some(TARGET_CRS))
}
