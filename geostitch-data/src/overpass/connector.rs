//! Overpass-backed [`SourceConnector`] for transit stops.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use geo::{Point, Rect};
use geostitch_core::spatial::{bbox_prefilter, buffered_rect, clip_or_fallback};
use geostitch_core::{
    AreaOfInterest, ConnectorError, Crs, DatasetKind, Feature, FeatureCollection, SourceConnector,
    TARGET_CRS,
};
use log::{info, warn};
use serde_json::{Map, Value};
use url::Url;

use super::response::{OverpassElement, OverpassResponse};
use crate::http::{OutboundRequest, RateLimiter, ResilientClient};

/// Public Overpass interpreter endpoint.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Requests per second tolerated by the public Overpass instances.
pub const DEFAULT_OVERPASS_RPS: f64 = 2.0;

/// Buffer added around the area extent, in degrees.
pub const BBOX_BUFFER_DEGREES: f64 = 0.001;

const HEALTH_QUERY: &str = "[out:json][timeout:5]; node(1); out;";

/// Tag predicates selecting stops, in transport-mode priority order.
const STOP_SELECTORS: [(&str, &str, &str); 5] = [
    ("public_transport", "stop_position", "public_transport"),
    ("highway", "bus_stop", "bus"),
    ("railway", "tram_stop", "tram"),
    ("railway", "station", "rail_station"),
    ("amenity", "ferry_terminal", "ferry"),
];

/// Tags copied into flat attributes; missing ones become `""`.
const COPIED_TAGS: [&str; 8] = [
    "name",
    "operator",
    "public_transport",
    "highway",
    "railway",
    "amenity",
    "ref",
    "network",
];

/// Transit stops connector.
///
/// Every query waits on the shared [`RateLimiter`] before it is posted, so
/// several connectors can share one limiter per Overpass instance.
#[derive(Debug, Clone)]
pub struct OverpassConnector {
    http: ResilientClient,
    endpoint: Url,
    limiter: Arc<RateLimiter>,
}

impl OverpassConnector {
    /// Create a connector for the interpreter at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] when `endpoint` is not an absolute URL.
    pub fn new(
        http: ResilientClient,
        endpoint: &str,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            http,
            endpoint: Url::parse(endpoint)?,
            limiter,
        })
    }

    async fn post(&self, query: String) -> Result<Vec<u8>, ConnectorError> {
        self.limiter.acquire().await;
        // Overpass queries are read-only, so replaying them is harmless.
        let request =
            OutboundRequest::post(self.endpoint.clone(), query, "text/plain").idempotent(true);
        self.http.execute(&request).await
    }
}

/// Overpass QL selecting every stop inside `bbox` (WGS84).
fn stops_query(bbox: Rect<f64>) -> String {
    // Overpass expects south,west,north,east.
    let filter = format!(
        "{},{},{},{}",
        bbox.min().y,
        bbox.min().x,
        bbox.max().y,
        bbox.max().x
    );
    let mut query = String::from("[out:json][timeout:25];\n(\n");
    for (key, value, _) in STOP_SELECTORS {
        query.push_str(&format!("  node[\"{key}\"=\"{value}\"]({filter});\n"));
    }
    query.push_str(");\nout geom;");
    query
}

fn transport_mode(tags: &BTreeMap<String, String>) -> &'static str {
    STOP_SELECTORS
        .iter()
        .find(|(key, value, _)| tags.get(*key).is_some_and(|tag| tag == value))
        .map_or("unknown", |(_, _, mode)| *mode)
}

/// Convert a node into a WGS84 point feature.
fn stop_feature(element: OverpassElement) -> Option<Feature> {
    if element.element_type != "node" {
        return None;
    }
    let (Some(lat), Some(lon)) = (element.lat, element.lon) else {
        return None;
    };
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        warn!("skipping node {} with invalid coordinates {lat}, {lon}", element.id);
        return None;
    }
    let mut attributes = Map::new();
    attributes.insert("osm_id".to_owned(), Value::from(element.id));
    attributes.insert(
        "transport_mode".to_owned(),
        Value::from(transport_mode(&element.tags)),
    );
    for key in COPIED_TAGS {
        let value = element.tags.get(key).cloned().unwrap_or_default();
        attributes.insert(key.to_owned(), Value::from(value));
    }
    let raw_tags = if element.tags.is_empty() {
        String::new()
    } else {
        serde_json::to_string(&element.tags).unwrap_or_default()
    };
    attributes.insert("osm_tags".to_owned(), Value::from(raw_tags));
    Some(Feature::new(Point::new(lon, lat).into(), attributes))
}

#[async_trait]
impl SourceConnector for OverpassConnector {
    fn kind(&self) -> DatasetKind {
        DatasetKind::TransitStops
    }

    async fn fetch(&self, area: &AreaOfInterest) -> Result<FeatureCollection, ConnectorError> {
        let geographic = area.to_crs(Crs::WGS84).map_err(ConnectorError::decode)?;
        let bbox = buffered_rect(geographic.bounds(), BBOX_BUFFER_DEGREES);
        let body = self.post(stops_query(bbox)).await?;
        let response: OverpassResponse =
            serde_json::from_slice(&body).map_err(ConnectorError::decode)?;
        let total = response.elements.len();
        let stops = FeatureCollection::new(
            response
                .elements
                .into_iter()
                .filter_map(stop_feature)
                .collect(),
            Some(Crs::WGS84),
        );
        info!("processed {} of {total} Overpass elements", stops.len());

        let projected = bbox_prefilter(stops, bbox)
            .into_crs(TARGET_CRS)
            .map_err(ConnectorError::decode)?;
        let target = area.to_crs(TARGET_CRS).map_err(ConnectorError::decode)?;
        Ok(clip_or_fallback(
            projected,
            target.boundary(),
            DatasetKind::TransitStops.as_str(),
        ))
    }

    async fn health_check(&self) -> bool {
        match self.post(HEALTH_QUERY.to_owned()).await {
            Ok(body) => String::from_utf8_lossy(&body).contains("elements"),
            Err(err) => {
                warn!("Overpass health check failed: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail fast on setup errors")]
#[expect(clippy::float_arithmetic, reason = "tolerance checks")]
mod tests {
    use super::*;
    use crate::http::{HttpClientConfig, RetryPolicy};
    use geo::{Coord, MultiPolygon};
    use geostitch_core::Transformer;
    use geostitch_core::test_support::{BOUNDARY_ORIGIN, BOUNDARY_SIZE, square};
    use rstest::{fixture, rstest};
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[fixture]
    fn pankow() -> AreaOfInterest {
        let (x, y) = BOUNDARY_ORIGIN;
        AreaOfInterest::new(
            "Pankow",
            MultiPolygon::new(vec![square(x, y, BOUNDARY_SIZE)]),
            TARGET_CRS,
        )
        .expect("valid area")
    }

    fn connector_for(server: &MockServer) -> OverpassConnector {
        let http = ResilientClient::new(HttpClientConfig::default(), RetryPolicy::no_retry())
            .expect("client should build");
        let limiter = Arc::new(RateLimiter::with_interval(Duration::from_millis(1)));
        OverpassConnector::new(http, &format!("{}/api/interpreter", server.uri()), limiter)
            .expect("valid endpoint")
    }

    /// WGS84 position of a point given in the target CRS.
    fn lon_lat(x: f64, y: f64) -> Coord<f64> {
        Transformer::new(TARGET_CRS, Crs::WGS84)
            .and_then(|t| t.transform_coord(Coord { x, y }))
            .expect("inside the UTM domain")
    }

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[rstest]
    fn query_lists_every_selector_with_south_west_north_east() {
        let bbox = Rect::new(Coord { x: 13.3, y: 52.5 }, Coord { x: 13.5, y: 52.6 });
        let query = stops_query(bbox);
        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains("node[\"highway\"=\"bus_stop\"](52.5,13.3,52.6,13.5);"));
        assert!(query.contains("node[\"amenity\"=\"ferry_terminal\"]"));
        assert!(query.ends_with("out geom;"));
    }

    #[rstest]
    #[case(&[("public_transport", "stop_position"), ("highway", "bus_stop")], "public_transport")]
    #[case(&[("highway", "bus_stop")], "bus")]
    #[case(&[("railway", "tram_stop")], "tram")]
    #[case(&[("railway", "station")], "rail_station")]
    #[case(&[("amenity", "ferry_terminal")], "ferry")]
    #[case(&[("railway", "platform")], "unknown")]
    fn derives_transport_mode(#[case] pairs: &[(&str, &str)], #[case] expected: &str) {
        assert_eq!(transport_mode(&tags(pairs)), expected);
    }

    #[rstest]
    #[case("way", Some(52.5), Some(13.4))]
    #[case("node", None, Some(13.4))]
    #[case("node", Some(95.0), Some(13.4))]
    #[case("node", Some(52.5), Some(-181.0))]
    fn skips_unusable_elements(
        #[case] element_type: &str,
        #[case] lat: Option<f64>,
        #[case] lon: Option<f64>,
    ) {
        let element = OverpassElement {
            element_type: element_type.to_owned(),
            id: 7,
            lat,
            lon,
            tags: BTreeMap::new(),
        };
        assert!(stop_feature(element).is_none());
    }

    #[rstest]
    fn flattens_tags_with_empty_defaults() {
        let element = OverpassElement {
            element_type: "node".to_owned(),
            id: 42,
            lat: Some(52.5),
            lon: Some(13.4),
            tags: tags(&[("highway", "bus_stop"), ("name", "Rathaus Pankow")]),
        };
        let feature = stop_feature(element).expect("valid node");
        assert_eq!(feature.attributes["osm_id"], 42);
        assert_eq!(feature.attributes["name"], "Rathaus Pankow");
        assert_eq!(feature.attributes["operator"], "");
        assert_eq!(feature.attributes["transport_mode"], "bus");
        let raw: BTreeMap<String, String> = serde_json::from_str(
            feature.attributes["osm_tags"].as_str().expect("string"),
        )
        .expect("tags are JSON");
        assert_eq!(raw.len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn fetches_and_projects_stops_inside_the_area(pankow: AreaOfInterest) {
        let inside = lon_lat(390_500.0, 5_820_500.0);
        let outside = lon_lat(391_050.0, 5_820_500.0);
        let body = format!(
            r#"{{"elements":[
                {{"type":"node","id":1,"lat":{},"lon":{},"tags":{{"highway":"bus_stop"}}}},
                {{"type":"node","id":2,"lat":{},"lon":{},"tags":{{"railway":"tram_stop"}}}},
                {{"type":"way","id":3}}
            ]}}"#,
            inside.y, inside.x, outside.y, outside.x
        );
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/interpreter"))
            .and(header("content-type", "text/plain"))
            .and(body_string_contains("node[\"railway\"=\"station\"]"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let stops = connector_for(&server)
            .fetch(&pankow)
            .await
            .expect("fetch should succeed");

        assert_eq!(stops.crs, Some(TARGET_CRS));
        assert_eq!(stops.len(), 1);
        let stop = stops.features.first().expect("one stop");
        assert_eq!(stop.attributes["osm_id"], 1);
        let geo::Geometry::Point(point) = &stop.geometry else {
            panic!("expected a point");
        };
        assert!((point.x() - 390_500.0).abs() < 1e-3);
        assert!((point.y() - 5_820_500.0).abs() < 1e-3);
    }

    #[rstest]
    #[tokio::test]
    async fn server_errors_surface_as_typed_errors(pankow: AreaOfInterest) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = connector_for(&server)
            .fetch(&pankow)
            .await
            .expect_err("rate limited");

        assert!(matches!(err, ConnectorError::RateLimited { .. }));
    }

    #[rstest]
    #[case(r#"{"elements":[]}"#, true)]
    #[case("runtime error: open64", false)]
    #[tokio::test]
    async fn health_check_looks_for_elements(#[case] body: &str, #[case] healthy: bool) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("node(1)"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        assert_eq!(connector_for(&server).health_check().await, healthy);
    }
}
