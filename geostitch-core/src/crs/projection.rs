//! Projection maths behind [`super::Transformer`].
//!
//! Transverse Mercator uses Krüger's series truncated at the third power of
//! the third flattening, which is accurate to well under a millimetre inside
//! a UTM zone.
#![expect(clippy::float_arithmetic, reason = "projection formulas")]

use std::f64::consts::FRAC_PI_4;

use geo::Coord;

use super::{Crs, CrsError};

const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;
/// Latitude at which Web Mercator becomes square.
const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;
const UTM_SCALE: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Ellipsoid {
    semi_major: f64,
    flattening: f64,
}

const GRS80: Ellipsoid = Ellipsoid {
    semi_major: 6_378_137.0,
    flattening: 1.0 / 298.257_222_101,
};

const WGS84: Ellipsoid = Ellipsoid {
    semi_major: 6_378_137.0,
    flattening: 1.0 / 298.257_223_563,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Projection {
    Geographic,
    WebMercator,
    TransverseMercator(TransverseMercator),
}

impl Projection {
    pub(super) fn for_crs(crs: Crs) -> Result<Self, CrsError> {
        match crs.epsg() {
            4326 => Ok(Self::Geographic),
            3857 => Ok(Self::WebMercator),
            code @ 25828..=25838 => Ok(Self::TransverseMercator(TransverseMercator::utm(
                GRS80,
                code - 25800,
            ))),
            code @ 32601..=32660 => Ok(Self::TransverseMercator(TransverseMercator::utm(
                WGS84,
                code - 32600,
            ))),
            _ => Err(CrsError::Unsupported { crs }),
        }
    }

    /// Geographic degrees into projected coordinates.
    pub(super) fn forward(&self, lon_lat: Coord<f64>) -> Option<Coord<f64>> {
        let Coord { x: lon, y: lat } = lon_lat;
        if !lon.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return None;
        }
        let projected = match self {
            Self::Geographic => lon_lat,
            Self::WebMercator => {
                if lat.abs() > WEB_MERCATOR_MAX_LAT {
                    return None;
                }
                Coord {
                    x: WEB_MERCATOR_RADIUS * lon.to_radians(),
                    y: WEB_MERCATOR_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln(),
                }
            }
            Self::TransverseMercator(tm) => tm.forward(lon, lat),
        };
        finite(projected)
    }

    /// Projected coordinates back into geographic degrees.
    pub(super) fn inverse(&self, coord: Coord<f64>) -> Option<Coord<f64>> {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return None;
        }
        let geographic = match self {
            Self::Geographic => {
                if !(-90.0..=90.0).contains(&coord.y) {
                    return None;
                }
                coord
            }
            Self::WebMercator => Coord {
                x: (coord.x / WEB_MERCATOR_RADIUS).to_degrees(),
                y: (2.0 * (coord.y / WEB_MERCATOR_RADIUS).exp().atan()
                    - std::f64::consts::FRAC_PI_2)
                    .to_degrees(),
            },
            Self::TransverseMercator(tm) => tm.inverse(coord.x, coord.y),
        };
        finite(geographic)
    }
}

fn finite(coord: Coord<f64>) -> Option<Coord<f64>> {
    (coord.x.is_finite() && coord.y.is_finite()).then_some(coord)
}

/// Northern-hemisphere UTM projection on a given ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct TransverseMercator {
    central_meridian: f64,
    /// Rectifying radius scaled by the central scale factor.
    scaled_radius: f64,
    eccentricity: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
}

impl TransverseMercator {
    fn utm(ellipsoid: Ellipsoid, zone: u32) -> Self {
        let f = ellipsoid.flattening;
        let n = f / (2.0 - f);
        let n2 = n * n;
        let n3 = n2 * n;
        let rectifying = ellipsoid.semi_major / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0);
        Self {
            central_meridian: (f64::from(zone) * 6.0 - 183.0).to_radians(),
            scaled_radius: UTM_SCALE * rectifying,
            eccentricity: (f * (2.0 - f)).sqrt(),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
                n2 / 48.0 + n3 / 15.0,
                17.0 * n3 / 480.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
                56.0 * n3 / 15.0,
            ],
        }
    }

    fn forward(&self, lon: f64, lat: f64) -> Coord<f64> {
        let phi = lat.to_radians();
        let d_lambda = lon.to_radians() - self.central_meridian;
        let sin_phi = phi.sin();
        let e = self.eccentricity;
        let t = (sin_phi.atanh() - e * (e * sin_phi).atanh()).sinh();
        let xi_prime = t.atan2(d_lambda.cos());
        let eta_prime = (d_lambda.sin() / (1.0 + t * t).sqrt()).atanh();

        let (mut xi, mut eta) = (xi_prime, eta_prime);
        for (j, alpha) in (1_u8..).zip(self.alpha) {
            let k = 2.0 * f64::from(j);
            xi += alpha * (k * xi_prime).sin() * (k * eta_prime).cosh();
            eta += alpha * (k * xi_prime).cos() * (k * eta_prime).sinh();
        }
        Coord {
            x: UTM_FALSE_EASTING + self.scaled_radius * eta,
            y: self.scaled_radius * xi,
        }
    }

    fn inverse(&self, easting: f64, northing: f64) -> Coord<f64> {
        let xi = northing / self.scaled_radius;
        let eta = (easting - UTM_FALSE_EASTING) / self.scaled_radius;

        let (mut xi_prime, mut eta_prime) = (xi, eta);
        for (j, beta) in (1_u8..).zip(self.beta) {
            let k = 2.0 * f64::from(j);
            xi_prime -= beta * (k * xi).sin() * (k * eta).cosh();
            eta_prime -= beta * (k * xi).cos() * (k * eta).sinh();
        }
        let chi = (xi_prime.sin() / eta_prime.cosh()).asin();
        let mut phi = chi;
        for (j, delta) in (1_u8..).zip(self.delta) {
            phi += delta * (2.0 * f64::from(j) * chi).sin();
        }
        let lambda = self.central_meridian + eta_prime.sinh().atan2(xi_prime.cos());
        Coord {
            x: lambda.to_degrees(),
            y: phi.to_degrees(),
        }
    }
}
