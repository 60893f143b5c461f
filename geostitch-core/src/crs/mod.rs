//! Coordinate reference systems and reprojection.
//!
//! A [`Crs`] is identified by its EPSG code. Reprojection is implemented
//! natively for the handful of systems the geodata sources publish in:
//! geographic WGS84 longitude/latitude, Web Mercator and the UTM zones of the
//! ETRS89 and WGS84 datums. ETRS89 and WGS84 are treated as coincident, which
//! keeps errors well below a metre across Europe.
//!
//! Geographic coordinates always use `x = longitude`, `y = latitude`, matching
//! GeoJSON rather than the EPSG axis order.

mod projection;

use std::fmt;
use std::str::FromStr;

use geo::{Coord, Geometry, MapCoords};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use projection::Projection;

/// An EPSG-coded coordinate reference system.
///
/// # Examples
///
/// ```
/// use geostitch_core::Crs;
///
/// let crs: Crs = "urn:ogc:def:crs:EPSG::25833".parse()?;
/// assert_eq!(crs, Crs::ETRS89_UTM33N);
/// assert_eq!(crs.to_string(), "EPSG:25833");
/// # Ok::<(), geostitch_core::CrsError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs(u32);

/// The CRS every harmonized geometry is expressed in.
pub const TARGET_CRS: Crs = Crs::ETRS89_UTM33N;

impl Crs {
    /// WGS84 longitude/latitude.
    pub const WGS84: Self = Self(4326);
    /// Spherical Web Mercator.
    pub const WEB_MERCATOR: Self = Self(3857);
    /// ETRS89 / UTM zone 33N.
    pub const ETRS89_UTM33N: Self = Self(25833);

    /// Wrap a raw EPSG code.
    #[must_use]
    pub const fn from_epsg(code: u32) -> Self {
        Self(code)
    }

    /// The EPSG code.
    #[must_use]
    pub const fn epsg(self) -> u32 {
        self.0
    }

    /// Parse an identifier in any of the common OGC spellings.
    ///
    /// Accepts `EPSG:n`, `urn:ogc:def:crs:EPSG::n`,
    /// `http://www.opengis.net/def/crs/EPSG/0/n` and the `CRS84` aliases.
    ///
    /// # Errors
    ///
    /// Returns [`CrsError::Unrecognised`] when no EPSG code can be extracted.
    pub fn parse(identifier: &str) -> Result<Self, CrsError> {
        let trimmed = identifier.trim();
        let unrecognised = || CrsError::Unrecognised {
            identifier: identifier.to_owned(),
        };
        if trimmed.to_ascii_uppercase().ends_with("CRS84") {
            return Ok(Self::WGS84);
        }
        let code = trimmed
            .rsplit([':', '/'])
            .next()
            .filter(|_| trimmed.to_ascii_uppercase().contains("EPSG"))
            .ok_or_else(unrecognised)?;
        code.parse::<u32>().map(Self).map_err(|_| unrecognised())
    }

    /// Whether reprojection to and from this CRS is available.
    #[must_use]
    pub fn is_supported(self) -> bool {
        Projection::for_crs(self).is_ok()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for Crs {
    type Err = CrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Crs {
    type Error = CrsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Crs> for String {
    fn from(value: Crs) -> Self {
        value.to_string()
    }
}

/// Errors raised while identifying or reprojecting between CRSs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrsError {
    /// The identifier did not contain an EPSG code.
    #[error("unrecognised CRS identifier {identifier:?}")]
    Unrecognised {
        /// Identifier as supplied.
        identifier: String,
    },
    /// No projection is implemented for this CRS.
    #[error("reprojection from or to {crs} is not supported")]
    Unsupported {
        /// Offending CRS.
        crs: Crs,
    },
    /// A coordinate lies outside the domain of the projection.
    #[error("coordinate ({x}, {y}) is outside the domain of {crs}")]
    OutOfDomain {
        /// CRS whose domain was violated.
        crs: Crs,
        /// Rendered x coordinate.
        x: String,
        /// Rendered y coordinate.
        y: String,
    },
}

/// Reprojects coordinates from one CRS to another.
///
/// Identical source and target CRSs short-circuit to a copy, which makes
/// reprojection into the target CRS idempotent.
#[derive(Debug, Clone, Copy)]
pub struct Transformer {
    from: (Crs, Projection),
    to: (Crs, Projection),
}

impl Transformer {
    /// Build a transformer between two CRSs.
    ///
    /// # Errors
    ///
    /// Returns [`CrsError::Unsupported`] if either side has no projection.
    pub fn new(from: Crs, to: Crs) -> Result<Self, CrsError> {
        Ok(Self {
            from: (from, Projection::for_crs(from)?),
            to: (to, Projection::for_crs(to)?),
        })
    }

    /// Whether the transformer leaves coordinates untouched.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.from.0 == self.to.0
    }

    /// Reproject a single coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`CrsError::OutOfDomain`] when the coordinate cannot be
    /// represented in either CRS.
    pub fn transform_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>, CrsError> {
        if self.is_identity() {
            return Ok(coord);
        }
        let (from_crs, from) = self.from;
        let (to_crs, to) = self.to;
        let geographic = from
            .inverse(coord)
            .ok_or_else(|| out_of_domain(from_crs, coord))?;
        to.forward(geographic)
            .ok_or_else(|| out_of_domain(to_crs, geographic))
    }

    /// Reproject every coordinate of a geometry.
    ///
    /// # Errors
    ///
    /// Fails on the first coordinate that cannot be reprojected.
    pub fn transform_geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>, CrsError> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|coord| self.transform_coord(coord))
    }
}

fn out_of_domain(crs: Crs, coord: Coord<f64>) -> CrsError {
    CrsError::OutOfDomain {
        crs,
        x: coord.x.to_string(),
        y: coord.y.to_string(),
    }
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail fast on setup errors")]
#[expect(clippy::float_arithmetic, reason = "tolerance checks")]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    const METRE_TOLERANCE: f64 = 1.0e-3;
    const DEGREE_TOLERANCE: f64 = 1.0e-7;

    #[rstest]
    #[case("EPSG:25833", 25833)]
    #[case("epsg:4326", 4326)]
    #[case("urn:ogc:def:crs:EPSG::25833", 25833)]
    #[case("urn:ogc:def:crs:EPSG:6.9:3857", 3857)]
    #[case("http://www.opengis.net/def/crs/EPSG/0/32633", 32633)]
    #[case("urn:ogc:def:crs:OGC:1.3:CRS84", 4326)]
    fn parses_common_identifiers(#[case] identifier: &str, #[case] expected: u32) {
        let crs = Crs::parse(identifier).expect("identifier should parse");
        assert_eq!(crs.epsg(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("EPSG:abc")]
    #[case("25833")]
    #[case("urn:ogc:def:crs:OGC::WGS84")]
    fn rejects_identifiers_without_epsg_code(#[case] identifier: &str) {
        let err = Crs::parse(identifier).expect_err("identifier should be rejected");
        assert!(matches!(err, CrsError::Unrecognised { .. }));
    }

    #[rstest]
    #[case(Crs::WGS84, true)]
    #[case(Crs::WEB_MERCATOR, true)]
    #[case(Crs::from_epsg(25828), true)]
    #[case(Crs::from_epsg(25838), true)]
    #[case(Crs::from_epsg(32601), true)]
    #[case(Crs::from_epsg(32660), true)]
    #[case(Crs::from_epsg(25839), false)]
    #[case(Crs::from_epsg(31468), false)]
    fn reports_supported_systems(#[case] crs: Crs, #[case] supported: bool) {
        assert_eq!(crs.is_supported(), supported);
    }

    #[rstest]
    fn serialises_as_epsg_string() {
        let json = serde_json::to_string(&Crs::ETRS89_UTM33N).expect("serialise");
        assert_eq!(json, "\"EPSG:25833\"");
        let back: Crs = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, Crs::ETRS89_UTM33N);
    }

    #[rstest]
    #[case(13.409_444, 52.520_833, 392_082.806_087, 5_820_158.153_573)]
    #[case(13.4, 52.55, 391_514.008_195, 5_823_416.318_869)]
    #[case(15.0, 0.0, 500_000.0, 0.0)]
    #[case(12.0, 48.0, 276_224.084_600, 5_320_655.789_019)]
    fn projects_wgs84_into_utm33(
        #[case] lon: f64,
        #[case] lat: f64,
        #[case] easting: f64,
        #[case] northing: f64,
    ) {
        let transformer = Transformer::new(Crs::WGS84, TARGET_CRS).expect("supported");
        let projected = transformer
            .transform_coord(Coord { x: lon, y: lat })
            .expect("in domain");
        assert!((projected.x - easting).abs() < METRE_TOLERANCE, "{projected:?}");
        assert!((projected.y - northing).abs() < METRE_TOLERANCE, "{projected:?}");
    }

    #[rstest]
    fn projects_into_web_mercator() {
        let transformer = Transformer::new(Crs::WGS84, Crs::WEB_MERCATOR).expect("supported");
        let projected = transformer
            .transform_coord(Coord { x: 180.0, y: 0.0 })
            .expect("in domain");
        assert!((projected.x - 20_037_508.342_789).abs() < METRE_TOLERANCE);
        assert!(projected.y.abs() < METRE_TOLERANCE);
    }

    #[rstest]
    fn rejects_latitudes_beyond_web_mercator_limit() {
        let transformer = Transformer::new(Crs::WGS84, Crs::WEB_MERCATOR).expect("supported");
        let err = transformer
            .transform_coord(Coord { x: 0.0, y: 89.0 })
            .expect_err("pole is outside Web Mercator");
        assert!(matches!(err, CrsError::OutOfDomain { crs, .. } if crs == Crs::WEB_MERCATOR));
    }

    #[rstest]
    fn unsupported_crs_cannot_build_transformer() {
        let err = Transformer::new(Crs::from_epsg(31468), TARGET_CRS).expect_err("unsupported");
        assert_eq!(
            err,
            CrsError::Unsupported {
                crs: Crs::from_epsg(31468)
            }
        );
    }

    #[rstest]
    fn identity_transform_leaves_geometry_untouched() {
        let transformer = Transformer::new(TARGET_CRS, TARGET_CRS).expect("supported");
        let geometry = Geometry::Point(geo::Point::new(f64::MAX, -3.5));
        let same = transformer.transform_geometry(&geometry).expect("identity");
        assert_eq!(same, geometry);
    }

    proptest! {
        #[test]
        fn utm_round_trips_through_wgs84(lon in 9.0_f64..21.0, lat in 30.0_f64..70.0) {
            let forward = Transformer::new(Crs::WGS84, TARGET_CRS).expect("supported");
            let inverse = Transformer::new(TARGET_CRS, Crs::WGS84).expect("supported");
            let projected = forward.transform_coord(Coord { x: lon, y: lat }).expect("in domain");
            let back = inverse.transform_coord(projected).expect("in domain");
            prop_assert!((back.x - lon).abs() < DEGREE_TOLERANCE);
            prop_assert!((back.y - lat).abs() < DEGREE_TOLERANCE);
        }

        #[test]
        fn web_mercator_round_trips_to_utm(x in 1_000_000.0_f64..2_000_000.0, y in 6_000_000.0_f64..7_000_000.0) {
            let forward = Transformer::new(Crs::WEB_MERCATOR, TARGET_CRS).expect("supported");
            let inverse = Transformer::new(TARGET_CRS, Crs::WEB_MERCATOR).expect("supported");
            let projected = forward.transform_coord(Coord { x, y }).expect("in domain");
            let back = inverse.transform_coord(projected).expect("in domain");
            prop_assert!((back.x - x).abs() < 0.01);
            prop_assert!((back.y - y).abs() < 0.01);
        }
    }
}
