//! Geometry validation and repair.
//!
//! Valid geometries pass through untouched. Invalid ones are handed to a
//! [`GeometryRepair`] strategy and kept only when the repaired geometry is
//! valid; everything else is dropped and counted.
#![forbid(unsafe_code)]

use geo::{Geometry, MultiPolygon, Polygon, Validation, unary_union};
use geostitch_core::{Feature, FeatureCollection};
use log::{error, warn};

/// Strategy that turns an invalid geometry into a valid one.
pub trait GeometryRepair {
    /// Attempt a repair; `None` when the geometry cannot be repaired.
    fn repair(&self, geometry: &Geometry<f64>) -> Option<Geometry<f64>>;
}

impl<R: GeometryRepair + ?Sized> GeometryRepair for &R {
    fn repair(&self, geometry: &Geometry<f64>) -> Option<Geometry<f64>> {
        (**self).repair(geometry)
    }
}

/// Self-union of polygonal geometry.
///
/// Rings are re-noded and only their positively wound part survives, as
/// with a zero-width buffer. Zero-width spikes and duplicate rings disappear.
/// A self-crossing ring such as a bowtie keeps only its positively wound
/// lobe, so the repaired area can be smaller than the input's extent.
/// Non-polygonal geometry is not repairable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayRepair;

impl GeometryRepair for OverlayRepair {
    fn repair(&self, geometry: &Geometry<f64>) -> Option<Geometry<f64>> {
        let polygons: Vec<Polygon<f64>> = match geometry {
            Geometry::Polygon(polygon) => vec![polygon.clone()],
            Geometry::MultiPolygon(multi) => multi.0.clone(),
            Geometry::Rect(rect) => vec![rect.to_polygon()],
            Geometry::Triangle(triangle) => vec![triangle.to_polygon()],
            _ => return None,
        };
        let unioned: MultiPolygon<f64> = unary_union(&polygons);
        match unioned.0.as_slice() {
            [] => None,
            [single] => Some(Geometry::Polygon(single.clone())),
            _ => Some(Geometry::MultiPolygon(unioned)),
        }
    }
}

/// Result of [`validate_geometries`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    /// Features whose geometry is valid, repaired ones included.
    pub collection: FeatureCollection,
    /// Features kept after a successful repair.
    pub repaired: usize,
    /// Features dropped as unrepairable.
    pub dropped: usize,
}

/// Keep valid geometries, repair invalid ones and drop the rest.
///
/// # Examples
///
/// ```
/// use geo::polygon;
/// use geostitch_core::{Feature, FeatureCollection, TARGET_CRS};
/// use geostitch_harmonize::{OverlayRepair, validate_geometries};
///
/// let bowtie = polygon![
///     (x: 0.0, y: 0.0),
///     (x: 2.0, y: 2.0),
///     (x: 2.0, y: 0.0),
///     (x: 0.0, y: 2.0),
///     (x: 0.0, y: 0.0),
/// ];
/// let collection = FeatureCollection::new(vec![Feature::from_geometry(bowtie)], Some(TARGET_CRS));
/// let outcome = validate_geometries(collection, &OverlayRepair);
/// assert_eq!(outcome.collection.len(), 1);
/// assert_eq!((outcome.repaired, outcome.dropped), (1, 0));
/// ```
#[must_use]
pub fn validate_geometries<R>(collection: FeatureCollection, repair: &R) -> ValidationOutcome
where
    R: GeometryRepair + ?Sized,
{
    let crs = collection.crs;
    let mut kept = Vec::with_capacity(collection.len());
    let mut repaired = 0;
    let mut dropped = 0;
    for (index, feature) in collection.features.into_iter().enumerate() {
        if feature.geometry.is_valid() {
            kept.push(feature);
            continue;
        }
        match repair
            .repair(&feature.geometry)
            .filter(Validation::is_valid)
        {
            Some(geometry) => {
                repaired += 1;
                kept.push(Feature::new(geometry, feature.attributes));
            }
            None => {
                warn!("dropping unrepairable geometry at index {index}");
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        error!("dropped {dropped} unrepairable geometries");
    }
    ValidationOutcome {
        collection: FeatureCollection::new(kept, crs),
        repaired,
        dropped,
    }
}
