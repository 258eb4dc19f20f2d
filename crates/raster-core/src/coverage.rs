//! Which cells a polygon covers.
//!
//! Both scans start from the polygon's bounding box so that only the cells
//! under it are tested, never the whole grid.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::GeometryProvider;
use crate::georef::Georeference;

/// A covered cell and the fraction of it the polygon covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellCoverage {
    pub row: usize,
    pub col: usize,
    /// 1.0 for center coverage, the covered area fraction otherwise.
    pub weight: f64,
}

/// Cells whose center lies inside the polygon, in row-major order.
pub fn cells_by_center<G: GeometryProvider>(
    provider: &G,
    georef: &Georeference,
    polygon: &G::Polygon,
) -> Vec<CellCoverage> {
    let Some(window) = provider
        .bounding_box(polygon)
        .and_then(|bbox| georef.centers_within(&bbox))
    else {
        return Vec::new();
    };

    window
        .cells()
        .filter(|&(row, col)| {
            let (x, y) = georef.cell_center(row, col);
            provider.point_in_polygon(x, y, polygon)
        })
        .map(|(row, col)| CellCoverage {
            row,
            col,
            weight: 1.0,
        })
        .collect()
}

/// Cells overlapping the polygon with positive area, weighted by the covered fraction.
pub fn cells_by_area<G: GeometryProvider>(
    provider: &G,
    georef: &Georeference,
    polygon: &G::Polygon,
) -> Result<Vec<CellCoverage>> {
    let Some(window) = provider
        .bounding_box(polygon)
        .and_then(|bbox| georef.cells_touching(&bbox))
    else {
        return Ok(Vec::new());
    };

    let mut covered = Vec::new();
    for (row, col) in window.cells() {
        let weight = provider.intersection_area(&georef.cell_extent(row, col), polygon)?;
        if weight > 0.0 {
            covered.push(CellCoverage { row, col, weight });
        }
    }
    Ok(covered)
}
