//! Per-fetch runtime statistics.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use geo::{Rect, Validation};
use serde::{Serialize, Serializer};

use crate::feature::FeatureCollection;

/// Feature count at which the coverage heuristic saturates at 100 %.
pub const COVERAGE_SATURATION: usize = 1000;

/// Density proxy used in place of areal coverage.
///
/// Returns `min(100, count / saturation * 100)`. This is a simple stand-in
/// for coverage, not an intersection-area ratio.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "percentage of a saturation count")]
pub fn coverage_heuristic(feature_count: usize, saturation: usize) -> f64 {
    if saturation == 0 {
        return 100.0;
    }
    let ratio = count_as_f64(feature_count) / count_as_f64(saturation);
    (ratio * 100.0).min(100.0)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "feature counts stay far below 2^52"
)]
fn count_as_f64(count: usize) -> f64 {
    count as f64
}

/// Axis-aligned extent of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    /// Minimum x.
    pub min_x: f64,
    /// Minimum y.
    pub min_y: f64,
    /// Maximum x.
    pub max_x: f64,
    /// Maximum y.
    pub max_y: f64,
}

impl From<Rect<f64>> for Extent {
    fn from(rect: Rect<f64>) -> Self {
        Self {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        }
    }
}

/// Outcome of a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// The connector returned a collection.
    Success,
    /// The connector raised an error.
    Failed,
}

/// Timing and shape statistics for one fetched dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeStats {
    /// Wall-clock time spent in the connector.
    #[serde(rename = "latency_ms", serialize_with = "as_millis")]
    pub latency: Duration,
    /// Number of features returned.
    pub feature_count: usize,
    /// Bounds of the returned features.
    pub spatial_extent: Option<Extent>,
    /// See [`coverage_heuristic`].
    pub coverage_percentage: f64,
    /// Share of returned features with a valid geometry.
    pub data_quality_score: f64,
    /// Whether the fetch succeeded.
    pub status: FetchStatus,
    /// Error text for failed fetches.
    pub error_message: Option<String>,
    /// When the fetch started.
    #[serde(serialize_with = "as_unix_millis")]
    pub requested_at: SystemTime,
}

impl RuntimeStats {
    /// Statistics for a successful fetch.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "valid share of the feature count")]
    pub fn success(
        latency: Duration,
        collection: &FeatureCollection,
        requested_at: SystemTime,
    ) -> Self {
        let feature_count = collection.len();
        let valid = collection
            .features
            .iter()
            .filter(|feature| feature.geometry.is_valid())
            .count();
        let data_quality_score = if feature_count == 0 {
            0.0
        } else {
            count_as_f64(valid) / count_as_f64(feature_count)
        };
        Self {
            latency,
            feature_count,
            spatial_extent: collection.bounding_rect().map(Extent::from),
            coverage_percentage: coverage_heuristic(feature_count, COVERAGE_SATURATION),
            data_quality_score,
            status: FetchStatus::Success,
            error_message: None,
            requested_at,
        }
    }

    /// Statistics for a failed fetch.
    #[must_use]
    pub fn failed(latency: Duration, message: impl Into<String>, requested_at: SystemTime) -> Self {
        Self {
            latency,
            feature_count: 0,
            spatial_extent: None,
            coverage_percentage: 0.0,
            data_quality_score: 0.0,
            status: FetchStatus::Failed,
            error_message: Some(message.into()),
            requested_at,
        }
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

fn as_unix_millis<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    let millis = time
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| since.as_millis());
    serializer.serialize_u64(u64::try_from(millis).unwrap_or(u64::MAX))
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail fast on setup errors")]
#[expect(clippy::float_arithmetic, reason = "tolerance checks")]
mod tests {
    use super::*;
    use crate::crs::TARGET_CRS;
    use crate::feature::Feature;
    use geo::{point, polygon};
    use rstest::rstest;

    #[rstest]
    #[case(0, 0.0)]
    #[case(10, 1.0)]
    #[case(500, 50.0)]
    #[case(1000, 100.0)]
    #[case(25_000, 100.0)]
    fn coverage_saturates_at_one_thousand(#[case] count: usize, #[case] expected: f64) {
        let coverage = coverage_heuristic(count, COVERAGE_SATURATION);
        assert!((coverage - expected).abs() < 1.0e-9, "{coverage}");
    }

    #[rstest]
    fn success_counts_valid_geometries() {
        let spike = polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 4.0),
            (x: 2.0, y: 4.0),
            (x: 2.0, y: 6.0),
            (x: 2.0, y: 4.0),
            (x: 0.0, y: 4.0),
            (x: 0.0, y: 0.0),
        ];
        let collection = FeatureCollection::new(
            vec![
                Feature::from_geometry(point! { x: 1.0, y: 1.0 }),
                Feature::from_geometry(spike),
            ],
            Some(TARGET_CRS),
        );
        let stats = RuntimeStats::success(Duration::from_millis(12), &collection, UNIX_EPOCH);
        assert_eq!(stats.feature_count, 2);
        assert!((stats.data_quality_score - 0.5).abs() < 1.0e-9);
        assert_eq!(stats.status, FetchStatus::Success);
        let extent = stats.spatial_extent.expect("non-empty");
        assert!((extent.max_y - 6.0).abs() < 1.0e-9);
    }

    #[rstest]
    fn serialises_latency_in_milliseconds() {
        let stats = RuntimeStats::failed(Duration::from_millis(1500), "boom", UNIX_EPOCH);
        let json = serde_json::to_value(&stats).expect("serialise");
        assert_eq!(json["latency_ms"], 1500);
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error_message"], "boom");
        assert_eq!(json["requested_at"], 0);
    }
}
