//! Common test fixtures for raster tests.
//!
//! Extents are `(xmin, xmax, ymin, ymax)` tuples so that this crate stays
//! independent of the raster types.

/// Common extent definitions for testing.
pub mod extent {
    /// Unit square
    pub const UNIT: (f64, f64, f64, f64) = (0.0, 1.0, 0.0, 1.0);

    /// Far away from every other extent here
    pub const DISJOINT: (f64, f64, f64, f64) = (1000.0, 1001.0, 1000.0, 1001.0);
}

/// Common grid specifications for testing.
pub mod grid {
    /// 10x10 cells over the unit square
    pub const UNIT_10X10: GridSpec = GridSpec {
        rows: 10,
        cols: 10,
        extent: super::extent::UNIT,
    };

    /// Grid specification for testing.
    #[derive(Debug, Clone, Copy)]
    pub struct GridSpec {
        pub rows: usize,
        pub cols: usize,
        pub extent: (f64, f64, f64, f64),
    }

    impl GridSpec {
        /// Returns the total number of grid cells.
        pub fn size(&self) -> usize {
            self.rows * self.cols
        }

        /// Returns the cell size as (xres, yres).
        pub fn resolution(&self) -> (f64, f64) {
            let (xmin, xmax, ymin, ymax) = self.extent;
            (
                (xmax - xmin) / self.cols as f64,
                (ymax - ymin) / self.rows as f64,
            )
        }
    }
}

/// Polygon rings as vertex lists.
pub mod rings {
    /// Axis-aligned rectangle, counter-clockwise, not explicitly closed.
    pub fn rect(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Vec<(f64, f64)> {
        vec![(xmin, ymin), (xmax, ymin), (xmax, ymax), (xmin, ymax)]
    }

    /// Right triangle with the right angle at (x, y) and legs of `size`.
    pub fn triangle(x: f64, y: f64, size: f64) -> Vec<(f64, f64)> {
        vec![(x, y), (x + size, y), (x, y + size)]
    }

    /// Diamond centered on (cx, cy) reaching `radius` along each axis.
    pub fn diamond(cx: f64, cy: f64, radius: f64) -> Vec<(f64, f64)> {
        vec![
            (cx, cy - radius),
            (cx + radius, cy),
            (cx, cy + radius),
            (cx - radius, cy),
        ]
    }
}

/// Common CRS identifiers.
pub mod crs {
    /// WGS84 geographic
    pub const EPSG_4326: &str = "EPSG:4326";
}

/// Common no-data sentinels.
pub mod nodata {
    pub const NEG_9999: f64 = -9999.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_spec() {
        assert_eq!(grid::UNIT_10X10.size(), 100);
        let (dx, dy) = grid::UNIT_10X10.resolution();
        assert!((dx - 0.1).abs() < 1e-12);
        assert!((dy - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_rings() {
        assert_eq!(rings::rect(0.0, 0.0, 1.0, 2.0).len(), 4);
        assert_eq!(rings::triangle(0.0, 0.0, 1.0)[2], (0.0, 1.0));
        assert_eq!(rings::diamond(0.0, 0.0, 1.0)[1], (1.0, 0.0));
    }
}
