//! The named region a run acquires data for.

use geo::{BoundingRect, Geometry, MultiPolygon, Polygon, Rect};
use thiserror::Error;

use crate::crs::{Crs, CrsError, TARGET_CRS, Transformer};
use crate::feature::FeatureCollection;
use crate::spatial::buffered_rect;

/// A named region with one or more boundary polygons in an explicit CRS.
///
/// Built once per run from the boundary dataset and shared read-only with
/// every connector.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaOfInterest {
    name: String,
    boundary: MultiPolygon<f64>,
    crs: Crs,
    bounds: Rect<f64>,
}

/// Errors returned when constructing an [`AreaOfInterest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AreaError {
    /// The area name was blank.
    #[error("area name must not be empty")]
    EmptyName,
    /// No polygonal geometry was supplied for the area.
    #[error("boundary for {name:?} contains no polygons")]
    NoPolygons {
        /// Area name.
        name: String,
    },
    /// The boundary could not be moved into the requested CRS.
    #[error("failed to reproject boundary: {0}")]
    Reprojection(#[from] CrsError),
}

impl AreaOfInterest {
    /// Validate and construct an area.
    ///
    /// # Errors
    ///
    /// Returns [`AreaError::EmptyName`] for a blank name and
    /// [`AreaError::NoPolygons`] when `boundary` has no extent.
    pub fn new(
        name: impl Into<String>,
        boundary: MultiPolygon<f64>,
        crs: Crs,
    ) -> Result<Self, AreaError> {
        let owned_name = name.into();
        if owned_name.trim().is_empty() {
            return Err(AreaError::EmptyName);
        }
        let Some(bounds) = boundary.bounding_rect() else {
            return Err(AreaError::NoPolygons { name: owned_name });
        };
        Ok(Self {
            name: owned_name,
            boundary,
            crs,
            bounds,
        })
    }

    /// Build an area from the polygons of a boundary dataset.
    ///
    /// Non-polygonal features are ignored. A collection without a declared
    /// CRS is taken to be in the target CRS.
    ///
    /// # Errors
    ///
    /// Fails when the collection has no polygons or the name is blank.
    pub fn from_boundary_collection(
        name: impl Into<String>,
        collection: &FeatureCollection,
    ) -> Result<Self, AreaError> {
        let polygons: Vec<Polygon<f64>> = collection
            .features
            .iter()
            .flat_map(|feature| polygons_of(&feature.geometry))
            .collect();
        Self::new(
            name,
            MultiPolygon::new(polygons),
            collection.crs.unwrap_or(TARGET_CRS),
        )
    }

    /// Area name as requested.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Boundary polygons.
    #[must_use]
    pub const fn boundary(&self) -> &MultiPolygon<f64> {
        &self.boundary
    }

    /// CRS of [`Self::boundary`].
    #[must_use]
    pub const fn crs(&self) -> Crs {
        self.crs
    }

    /// Axis-aligned extent of the boundary.
    #[must_use]
    pub const fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Extent grown by `buffer` units on every side.
    #[must_use]
    pub fn buffered_bounds(&self, buffer: f64) -> Rect<f64> {
        buffered_rect(self.bounds, buffer)
    }

    /// The same area expressed in `target`.
    ///
    /// # Errors
    ///
    /// Returns [`AreaError::Reprojection`] when the boundary cannot be
    /// reprojected.
    pub fn to_crs(&self, target: Crs) -> Result<Self, AreaError> {
        let transformer = Transformer::new(self.crs, target)?;
        if transformer.is_identity() {
            return Ok(self.clone());
        }
        let reprojected =
            transformer.transform_geometry(&Geometry::MultiPolygon(self.boundary.clone()))?;
        Self::new(
            self.name.clone(),
            MultiPolygon::new(polygons_of(&reprojected)),
            target,
        )
    }
}

fn polygons_of(geometry: &Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => vec![polygon.clone()],
        Geometry::MultiPolygon(multi) => multi.0.clone(),
        Geometry::Rect(rect) => vec![rect.to_polygon()],
        Geometry::Triangle(triangle) => vec![triangle.to_polygon()],
        Geometry::GeometryCollection(collection) => {
            collection.iter().flat_map(polygons_of).collect()
        }
        _ => Vec::new(),
    }
}
