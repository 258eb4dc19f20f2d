//! Polygon geometry seen from the raster engines.
//!
//! The engines only ask three questions of a polygon: does it contain a
//! point, what is its bounding box, and how much of a cell does it cover.
//! [`GeometryProvider`] is that boundary; [`GeoProvider`] answers it with
//! the `geo` crate.

use geo::{Area, BooleanOps, BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon, Rect};

use crate::error::{RasterError, Result};
use crate::georef::Extent;

/// Point-in-polygon, bounding box and coverage tests over a polygon type.
pub trait GeometryProvider: Sync {
    /// The polygon representation this provider understands.
    type Polygon: Sync;

    /// True when (x, y) lies inside the polygon (holes excluded).
    fn point_in_polygon(&self, x: f64, y: f64, polygon: &Self::Polygon) -> bool;

    /// Bounding box, `None` for empty geometries.
    fn bounding_box(&self, polygon: &Self::Polygon) -> Option<Extent>;

    /// Whether [`intersection_area`](Self::intersection_area) is available.
    fn supports_intersection_area(&self) -> bool {
        false
    }

    /// Fraction in `[0, 1]` of `cell` covered by the polygon.
    fn intersection_area(&self, cell: &Extent, polygon: &Self::Polygon) -> Result<f64> {
        let _ = (cell, polygon);
        Err(RasterError::unsupported(
            "geometry provider cannot compute intersection areas",
        ))
    }
}

/// [`GeometryProvider`] over `geo` multipolygons.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoProvider;

impl GeometryProvider for GeoProvider {
    type Polygon = MultiPolygon<f64>;

    fn point_in_polygon(&self, x: f64, y: f64, polygon: &Self::Polygon) -> bool {
        polygon.contains(&Point::new(x, y))
    }

    fn bounding_box(&self, polygon: &Self::Polygon) -> Option<Extent> {
        polygon.bounding_rect().map(|rect| {
            let min = rect.min();
            let max = rect.max();
            Extent::new(min.x, max.x, min.y, max.y)
        })
    }

    fn supports_intersection_area(&self) -> bool {
        true
    }

    fn intersection_area(&self, cell: &Extent, polygon: &Self::Polygon) -> Result<f64> {
        let cell_area = cell.area();
        if cell_area <= 0.0 {
            return Ok(0.0);
        }

        let rect = Rect::new(
            Coord {
                x: cell.xmin,
                y: cell.ymin,
            },
            Coord {
                x: cell.xmax,
                y: cell.ymax,
            },
        );
        let cell_polygon = MultiPolygon::new(vec![rect.to_polygon()]);
        let covered = cell_polygon.intersection(polygon).unsigned_area();

        Ok((covered / cell_area).clamp(0.0, 1.0))
    }
}

/// Build a polygon from an exterior ring and optional holes.
///
/// Rings need not repeat their first vertex; they are closed implicitly.
pub fn polygon_from_rings(exterior: &[(f64, f64)], holes: &[Vec<(f64, f64)>]) -> MultiPolygon<f64> {
    let interiors = holes
        .iter()
        .map(|ring| LineString::from(ring.clone()))
        .collect();
    MultiPolygon::new(vec![Polygon::new(
        LineString::from(exterior.to_vec()),
        interiors,
    )])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        polygon_from_rings(&[(x0, y0), (x1, y0), (x1, y1), (x0, y1)], &[])
    }

    #[test]
    fn test_point_in_polygon_with_hole() {
        let provider = GeoProvider;
        let donut = polygon_from_rings(
            &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            &[vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)]],
        );
        assert!(provider.point_in_polygon(1.0, 1.0, &donut));
        assert!(!provider.point_in_polygon(5.0, 5.0, &donut));
        assert!(!provider.point_in_polygon(11.0, 5.0, &donut));
    }

    #[test]
    fn test_bounding_box() {
        let provider = GeoProvider;
        let triangle = polygon_from_rings(&[(1.0, 2.0), (5.0, 3.0), (2.0, 7.0)], &[]);
        let bbox = provider.bounding_box(&triangle).unwrap();
        assert_eq!(bbox, Extent::new(1.0, 5.0, 2.0, 7.0));
        assert!(provider.bounding_box(&MultiPolygon::new(vec![])).is_none());
    }

    #[test]
    fn test_intersection_fraction() {
        let provider = GeoProvider;
        let half = square(0.0, 0.0, 0.5, 1.0);
        let cell = Extent::new(0.0, 1.0, 0.0, 1.0);
        let fraction = provider.intersection_area(&cell, &half).unwrap();
        assert!((fraction - 0.5).abs() < 1e-9);

        let outside = square(2.0, 2.0, 3.0, 3.0);
        assert_eq!(provider.intersection_area(&cell, &outside).unwrap(), 0.0);

        let covering = square(-1.0, -1.0, 2.0, 2.0);
        let full = provider.intersection_area(&cell, &covering).unwrap();
        assert!((full - 1.0).abs() < 1e-9);
    }
}
