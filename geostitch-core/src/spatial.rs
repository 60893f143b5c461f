//! Bounding-box pre-filtering and exact clipping against an area boundary.

use geo::{
    BooleanOps, BoundingRect, CoordsIter, Geometry, Intersects, LineString, MultiLineString,
    MultiPoint, MultiPolygon, Rect, Validation, coord,
};
use log::warn;
use thiserror::Error;

use crate::feature::{Feature, FeatureCollection};

/// Errors raised by [`clip_to_boundary`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipError {
    /// The clip boundary has no polygons.
    #[error("clip boundary is empty")]
    EmptyBoundary,
    /// A geometry contains NaN or infinite coordinates.
    #[error("feature {index} has non-finite coordinates")]
    NonFinite {
        /// Position of the offending feature.
        index: usize,
    },
}

/// Grow `rect` by `buffer` on every side.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "grows the rectangle by a fixed margin")]
pub fn buffered_rect(rect: Rect<f64>, buffer: f64) -> Rect<f64> {
    Rect::new(
        coord! { x: rect.min().x - buffer, y: rect.min().y - buffer },
        coord! { x: rect.max().x + buffer, y: rect.max().y + buffer },
    )
}

/// Keep only features whose bounds intersect `rect`.
#[must_use]
pub fn bbox_prefilter(collection: FeatureCollection, rect: Rect<f64>) -> FeatureCollection {
    let crs = collection.crs;
    collection
        .features
        .into_iter()
        .filter(|feature| {
            feature
                .geometry
                .bounding_rect()
                .is_some_and(|bounds| bounds.intersects(&rect))
        })
        .collect::<FeatureCollection>()
        .with_crs(crs)
}

/// Intersect every feature with `boundary`.
///
/// Points and lines are cut to the boundary, polygons are intersected with it
/// and features left empty are removed. Invalid polygonal geometries are
/// passed through unclipped when their bounds touch the boundary so that the
/// repair stage can deal with them.
///
/// # Errors
///
/// Returns [`ClipError`] when the boundary is empty or a geometry is
/// non-finite. The input is not consumed so that callers can fall back to it.
pub fn clip_to_boundary(
    collection: &FeatureCollection,
    boundary: &MultiPolygon<f64>,
) -> Result<FeatureCollection, ClipError> {
    let Some(boundary_bounds) = boundary.bounding_rect() else {
        return Err(ClipError::EmptyBoundary);
    };
    let mut clipped = Vec::with_capacity(collection.len());
    for (index, feature) in collection.features.iter().enumerate() {
        if !is_finite(&feature.geometry) {
            return Err(ClipError::NonFinite { index });
        }
        let touches_bounds = feature
            .geometry
            .bounding_rect()
            .is_some_and(|bounds| bounds.intersects(&boundary_bounds));
        if !touches_bounds {
            continue;
        }
        if let Some(geometry) = clip_geometry(&feature.geometry, boundary) {
            clipped.push(Feature::new(geometry, feature.attributes.clone()));
        }
    }
    Ok(FeatureCollection::new(clipped, collection.crs))
}

/// [`clip_to_boundary`], falling back to the unclipped input on failure.
#[must_use]
pub fn clip_or_fallback(
    collection: FeatureCollection,
    boundary: &MultiPolygon<f64>,
    label: &str,
) -> FeatureCollection {
    match clip_to_boundary(&collection, boundary) {
        Ok(clipped) => clipped,
        Err(err) => {
            warn!("clipping {label} failed, keeping bbox-filtered features: {err}");
            collection
        }
    }
}

fn is_finite(geometry: &Geometry<f64>) -> bool {
    geometry
        .coords_iter()
        .all(|c| c.x.is_finite() && c.y.is_finite())
}

fn clip_geometry(geometry: &Geometry<f64>, boundary: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    match geometry {
        Geometry::Point(point) => boundary.intersects(point).then_some(geometry.clone()),
        Geometry::MultiPoint(points) => {
            let inside: MultiPoint<f64> = points
                .iter()
                .filter(|point| boundary.intersects(*point))
                .copied()
                .collect();
            (!inside.0.is_empty()).then_some(Geometry::MultiPoint(inside))
        }
        Geometry::Line(line) => clip_lines(
            &MultiLineString::new(vec![LineString::from(vec![line.start, line.end])]),
            boundary,
        ),
        Geometry::LineString(line) => {
            clip_lines(&MultiLineString::new(vec![line.clone()]), boundary)
        }
        Geometry::MultiLineString(lines) => clip_lines(lines, boundary),
        Geometry::Polygon(polygon) => {
            clip_polygons(&MultiPolygon::new(vec![polygon.clone()]), geometry, boundary)
        }
        Geometry::MultiPolygon(polygons) => clip_polygons(polygons, geometry, boundary),
        Geometry::Rect(rect) => clip_polygons(
            &MultiPolygon::new(vec![rect.to_polygon()]),
            geometry,
            boundary,
        ),
        Geometry::Triangle(triangle) => clip_polygons(
            &MultiPolygon::new(vec![triangle.to_polygon()]),
            geometry,
            boundary,
        ),
        Geometry::GeometryCollection(_) => {
            boundary.intersects(geometry).then_some(geometry.clone())
        }
    }
}

fn clip_lines(
    lines: &MultiLineString<f64>,
    boundary: &MultiPolygon<f64>,
) -> Option<Geometry<f64>> {
    let clipped = boundary.clip(lines, false);
    (!clipped.0.is_empty()).then_some(Geometry::MultiLineString(clipped))
}

fn clip_polygons(
    polygons: &MultiPolygon<f64>,
    original: &Geometry<f64>,
    boundary: &MultiPolygon<f64>,
) -> Option<Geometry<f64>> {
    // Overlay needs valid input; callers repair and clip again.
    if !polygons.is_valid() {
        return Some(original.clone());
    }
    let clipped = boundary.intersection(polygons);
    if clipped.0.is_empty() {
        return None;
    }
    match clipped.0.as_slice() {
        [single] => Some(Geometry::Polygon(single.clone())),
        _ => Some(Geometry::MultiPolygon(clipped)),
    }
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail fast on setup errors")]
#[expect(clippy::float_arithmetic, reason = "tolerance checks")]
mod tests {
    use super::*;
    use crate::crs::TARGET_CRS;
    use geo::{Area, Point, line_string, point, polygon};
    use rstest::{fixture, rstest};

    #[fixture]
    fn boundary() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ]])
    }

    fn collection(features: Vec<Feature>) -> FeatureCollection {
        FeatureCollection::new(features, Some(TARGET_CRS))
    }

    #[rstest]
    fn drops_points_outside_boundary(boundary: MultiPolygon<f64>) {
        let input = collection(vec![
            Feature::from_geometry(point! { x: 5.0, y: 5.0 }),
            Feature::from_geometry(point! { x: 15.0, y: 5.0 }),
        ]);
        let clipped = clip_to_boundary(&input, &boundary).expect("clip succeeds");
        assert_eq!(clipped.len(), 1);
        assert_eq!(clipped.crs, Some(TARGET_CRS));
    }

    #[rstest]
    fn cuts_lines_at_boundary(boundary: MultiPolygon<f64>) {
        let input = collection(vec![Feature::from_geometry(line_string![
            (x: 5.0, y: 5.0),
            (x: 15.0, y: 5.0),
        ])]);
        let clipped = clip_to_boundary(&input, &boundary).expect("clip succeeds");
        let Some(Geometry::MultiLineString(lines)) =
            clipped.features.first().map(|f| f.geometry.clone())
        else {
            panic!("expected clipped line");
        };
        let max_x = lines
            .coords_iter()
            .map(|c| c.x)
            .fold(f64::MIN, f64::max);
        assert!((max_x - 10.0).abs() < 1.0e-9);
    }

    #[rstest]
    fn intersects_polygons_with_boundary(boundary: MultiPolygon<f64>) {
        let input = collection(vec![Feature::from_geometry(polygon![
            (x: 5.0, y: 5.0),
            (x: 15.0, y: 5.0),
            (x: 15.0, y: 15.0),
            (x: 5.0, y: 15.0),
            (x: 5.0, y: 5.0),
        ])]);
        let clipped = clip_to_boundary(&input, &boundary).expect("clip succeeds");
        let area = clipped
            .features
            .first()
            .map(|f| f.geometry.unsigned_area())
            .expect("one feature");
        assert!((area - 25.0).abs() < 1.0e-9);
    }

    #[rstest]
    fn passes_invalid_polygons_through(boundary: MultiPolygon<f64>) {
        let bowtie = polygon![
            (x: 1.0, y: 1.0),
            (x: 3.0, y: 3.0),
            (x: 3.0, y: 1.0),
            (x: 1.0, y: 3.0),
            (x: 1.0, y: 1.0),
        ];
        let input = collection(vec![Feature::from_geometry(bowtie.clone())]);
        let clipped = clip_to_boundary(&input, &boundary).expect("clip succeeds");
        assert_eq!(
            clipped.features.first().map(|f| &f.geometry),
            Some(&Geometry::Polygon(bowtie))
        );
    }

    #[rstest]
    fn empty_boundary_is_an_error() {
        let input = collection(vec![Feature::from_geometry(point! { x: 5.0, y: 5.0 })]);
        let err = clip_to_boundary(&input, &MultiPolygon::new(Vec::new())).expect_err("empty");
        assert_eq!(err, ClipError::EmptyBoundary);
    }

    #[rstest]
    fn fallback_keeps_input_on_failure(boundary: MultiPolygon<f64>) {
        let input = collection(vec![
            Feature::from_geometry(point! { x: 5.0, y: 5.0 }),
            Feature::from_geometry(Point::new(f64::NAN, 1.0)),
        ]);
        let kept = clip_or_fallback(input.clone(), &boundary, "test");
        assert_eq!(kept, input);
    }

    #[rstest]
    fn prefilter_discards_distant_features() {
        let input = collection(vec![
            Feature::from_geometry(point! { x: 5.0, y: 5.0 }),
            Feature::from_geometry(point! { x: 500.0, y: 5.0 }),
        ]);
        let rect = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 10.0 });
        let kept = bbox_prefilter(input, buffered_rect(rect, 1.0));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.crs, Some(TARGET_CRS));
    }
}
