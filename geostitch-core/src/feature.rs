//! Features and feature collections.

use geo::{BoundingRect, Geometry, Rect, coord};
use log::warn;
use serde_json::{Map, Value};

use crate::crs::{Crs, CrsError, Transformer};

/// Free-form attribute row attached to a geometry.
pub type Attributes = Map<String, Value>;

/// One geometry plus its attribute values.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Geometry in the CRS of the owning collection.
    pub geometry: Geometry<f64>,
    /// Non-geometry columns.
    pub attributes: Attributes,
}

impl Feature {
    /// Construct a feature from its parts.
    #[must_use]
    pub const fn new(geometry: Geometry<f64>, attributes: Attributes) -> Self {
        Self {
            geometry,
            attributes,
        }
    }

    /// Construct a feature with no attributes.
    #[must_use]
    pub fn from_geometry(geometry: impl Into<Geometry<f64>>) -> Self {
        Self::new(geometry.into(), Attributes::new())
    }

    /// Builder-style attribute insertion.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// An ordered set of features sharing one CRS.
///
/// `crs` is `None` when the source did not declare one. Consumers treat an
/// undeclared CRS as the target CRS rather than failing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    /// Features in source order.
    pub features: Vec<Feature>,
    /// Declared CRS, if any.
    pub crs: Option<Crs>,
}

impl FeatureCollection {
    /// Construct a collection.
    #[must_use]
    pub const fn new(features: Vec<Feature>, crs: Option<Crs>) -> Self {
        Self { features, crs }
    }

    /// An empty collection tagged with `crs`.
    #[must_use]
    pub const fn empty(crs: Crs) -> Self {
        Self::new(Vec::new(), Some(crs))
    }

    /// Replace the declared CRS without touching coordinates.
    #[must_use]
    pub fn with_crs(mut self, crs: Option<Crs>) -> Self {
        self.crs = crs;
        self
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounding rectangle of every geometry, or `None` when empty.
    #[must_use]
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        union_bounds(self.features.iter().map(|feature| &feature.geometry))
    }

    /// Reproject into `target`, consuming the collection.
    ///
    /// A collection without a declared CRS is assumed to already be in
    /// `target`; the assumption is logged and the features are returned as
    /// they are.
    ///
    /// # Errors
    ///
    /// Returns [`CrsError`] if either CRS is unsupported or a coordinate falls
    /// outside the source or target domain.
    pub fn into_crs(self, target: Crs) -> Result<Self, CrsError> {
        let Some(source) = self.crs else {
            warn!("collection has no declared CRS; assuming {target}");
            return Ok(Self::new(self.features, Some(target)));
        };
        let transformer = Transformer::new(source, target)?;
        if transformer.is_identity() {
            return Ok(self);
        }
        let features = self
            .features
            .into_iter()
            .map(|feature| {
                transformer
                    .transform_geometry(&feature.geometry)
                    .map(|geometry| Feature::new(geometry, feature.attributes))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(features, Some(target)))
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<T: IntoIterator<Item = Feature>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect(), None)
    }
}

/// Smallest rectangle covering every geometry's bounds.
#[must_use]
pub fn union_bounds<'a, I>(geometries: I) -> Option<Rect<f64>>
where
    I: IntoIterator<Item = &'a Geometry<f64>>,
{
    geometries
        .into_iter()
        .filter_map(|geometry| geometry.bounding_rect())
        .reduce(|acc, rect| {
            Rect::new(
                coord! { x: acc.min().x.min(rect.min().x), y: acc.min().y.min(rect.min().y) },
                coord! { x: acc.max().x.max(rect.max().x), y: acc.max().y.max(rect.max().y) },
            )
        })
}
