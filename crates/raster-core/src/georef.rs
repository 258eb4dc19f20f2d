//! Extents and the mapping between cell indices and coordinates.
//!
//! Row 0 is the northern (ymax) edge and rows grow southward. Column 0 is
//! the western (xmin) edge and columns grow eastward.

use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};

/// Relative tolerance used when snapping coordinates onto cell boundaries.
const SNAP_TOLERANCE: f64 = 1e-9;

/// An axis-aligned rectangle in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Extent {
    /// Create an extent from (xmin, xmax, ymin, ymax).
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// True when every bound is finite and the rectangle has positive area.
    pub fn is_valid(&self) -> bool {
        [self.xmin, self.xmax, self.ymin, self.ymax]
            .iter()
            .all(|v| v.is_finite())
            && self.xmax > self.xmin
            && self.ymax > self.ymin
    }

    /// Check if the two extents overlap with positive area.
    pub fn intersects(&self, other: &Extent) -> bool {
        self.xmin < other.xmax
            && self.xmax > other.xmin
            && self.ymin < other.ymax
            && self.ymax > other.ymin
    }

    /// Overlapping rectangle, `None` when the overlap has no area.
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        if !self.intersects(other) {
            return None;
        }

        Some(Extent {
            xmin: self.xmin.max(other.xmin),
            xmax: self.xmax.min(other.xmax),
            ymin: self.ymin.max(other.ymin),
            ymax: self.ymax.min(other.ymax),
        })
    }

    /// Closed containment test.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    /// Check whether two extents agree within `tolerance` on every bound.
    pub fn approx_eq(&self, other: &Extent, tolerance: f64) -> bool {
        (self.xmin - other.xmin).abs() <= tolerance
            && (self.xmax - other.xmax).abs() <= tolerance
            && (self.ymin - other.ymin).abs() <= tolerance
            && (self.ymax - other.ymax).abs() <= tolerance
    }
}

/// A half-open block of cells: rows `row_start..row_end`, cols `col_start..col_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellWindow {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl CellWindow {
    pub fn rows(&self) -> usize {
        self.row_end - self.row_start
    }

    pub fn cols(&self) -> usize {
        self.col_end - self.col_start
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0 || self.cols() == 0
    }

    /// Iterate the (row, col) pairs of the window in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.row_start..self.row_end)
            .flat_map(move |row| (self.col_start..self.col_end).map(move |col| (row, col)))
    }
}

/// Georeferencing of a regular grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Georeference {
    extent: Extent,
    rows: usize,
    cols: usize,
    xres: f64,
    yres: f64,
    /// Coordinate reference identifier. Stored, never interpreted.
    crs: Option<String>,
}

impl Georeference {
    /// Georeference a `rows x cols` grid spanning `extent`.
    pub fn new(extent: Extent, rows: usize, cols: usize, crs: Option<String>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(RasterError::invalid_georeference(format!(
                "grid must have at least one row and column, got {}x{}",
                rows, cols
            )));
        }
        if !extent.is_valid() {
            return Err(RasterError::invalid_georeference(format!(
                "extent {:?} is empty or not finite",
                extent
            )));
        }

        Ok(Self {
            extent,
            rows,
            cols,
            xres: extent.width() / cols as f64,
            yres: extent.height() / rows as f64,
            crs,
        })
    }

    /// Georeference a grid from its north-west corner and cell size.
    pub fn from_resolution(
        xmin: f64,
        ymax: f64,
        xres: f64,
        yres: f64,
        rows: usize,
        cols: usize,
        crs: Option<String>,
    ) -> Result<Self> {
        if !(xres.is_finite() && yres.is_finite() && xres > 0.0 && yres > 0.0) {
            return Err(RasterError::invalid_georeference(format!(
                "resolution ({}, {}) must be positive and finite",
                xres, yres
            )));
        }
        let extent = Extent::new(
            xmin,
            xmin + cols as f64 * xres,
            ymax - rows as f64 * yres,
            ymax,
        );
        Self::new(extent, rows, cols, crs)
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell size as (xres, yres).
    pub fn resolution(&self) -> (f64, f64) {
        (self.xres, self.yres)
    }

    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn set_crs(&mut self, crs: Option<String>) {
        self.crs = crs;
    }

    /// Coordinates of the center of a cell.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let x = self.extent.xmin + (col as f64 + 0.5) * self.xres;
        let y = self.extent.ymax - (row as f64 + 0.5) * self.yres;
        (x, y)
    }

    /// Bounds of a single cell.
    pub fn cell_extent(&self, row: usize, col: usize) -> Extent {
        Extent::new(
            self.x_edge(col),
            self.x_edge(col + 1),
            self.y_edge(row + 1),
            self.y_edge(row),
        )
    }

    /// Cell containing a coordinate.
    ///
    /// Points on the eastern or southern edge belong to the last column or row.
    pub fn cell_index(&self, x: f64, y: f64) -> Result<(usize, usize)> {
        if !self.extent.contains_point(x, y) {
            return Err(RasterError::OutOfExtent { x, y });
        }

        let col = ((x - self.extent.xmin) / self.xres).floor() as usize;
        let row = ((self.extent.ymax - y) / self.yres).floor() as usize;
        Ok((row.min(self.rows - 1), col.min(self.cols - 1)))
    }

    /// Cell range enclosing `extent`, clamped to the grid.
    ///
    /// The requested bounds are widened to the nearest enclosing cell
    /// boundaries; bounds within floating tolerance of a boundary snap to it.
    pub fn sub_extent_indices(&self, extent: &Extent) -> Result<CellWindow> {
        let overlap = self.extent.intersection(extent).ok_or_else(|| {
            RasterError::EmptyIntersection(format!(
                "{:?} does not overlap {:?}",
                extent, self.extent
            ))
        })?;

        let col_start = snap_floor((overlap.xmin - self.extent.xmin) / self.xres);
        let col_end = snap_ceil((overlap.xmax - self.extent.xmin) / self.xres);
        let row_start = snap_floor((self.extent.ymax - overlap.ymax) / self.yres);
        let row_end = snap_ceil((self.extent.ymax - overlap.ymin) / self.yres);

        let window = CellWindow {
            row_start: clamp_index(row_start, self.rows),
            row_end: clamp_index(row_end, self.rows),
            col_start: clamp_index(col_start, self.cols),
            col_end: clamp_index(col_end, self.cols),
        };

        if window.is_empty() {
            return Err(RasterError::EmptyIntersection(format!(
                "{:?} covers no cells",
                extent
            )));
        }
        Ok(window)
    }

    /// Cells whose centers may fall inside `extent` (closed bounds).
    ///
    /// Returns `None` when no center does. Used to limit polygon scans to the
    /// polygon's bounding box.
    pub fn centers_within(&self, extent: &Extent) -> Option<CellWindow> {
        let col_start = ((extent.xmin - self.extent.xmin) / self.xres - 0.5).ceil();
        let col_last = ((extent.xmax - self.extent.xmin) / self.xres - 0.5).floor();
        let row_start = ((self.extent.ymax - extent.ymax) / self.yres - 0.5).ceil();
        let row_last = ((self.extent.ymax - extent.ymin) / self.yres - 0.5).floor();

        let window = CellWindow {
            row_start: clamp_index(row_start, self.rows),
            row_end: clamp_index(row_last + 1.0, self.rows),
            col_start: clamp_index(col_start, self.cols),
            col_end: clamp_index(col_last + 1.0, self.cols),
        };
        (!window.is_empty()).then_some(window)
    }

    /// Cells overlapping `extent` with positive area.
    pub fn cells_touching(&self, extent: &Extent) -> Option<CellWindow> {
        self.sub_extent_indices(extent).ok()
    }

    /// Exact bounds of a block of cells.
    pub fn window_extent(&self, window: &CellWindow) -> Extent {
        Extent::new(
            self.x_edge(window.col_start),
            self.x_edge(window.col_end),
            self.y_edge(window.row_end),
            self.y_edge(window.row_start),
        )
    }

    /// Georeference of a block of cells of this grid.
    pub fn window(&self, window: &CellWindow) -> Result<Georeference> {
        Georeference::new(
            self.window_extent(window),
            window.rows(),
            window.cols(),
            self.crs.clone(),
        )
    }

    // Edges are measured as fractions of the extent so that cell-aligned
    // bounds reproduce the source coordinates exactly.
    fn x_edge(&self, col: usize) -> f64 {
        match col {
            0 => self.extent.xmin,
            c if c >= self.cols => self.extent.xmax,
            c => self.extent.xmin + self.extent.width() * c as f64 / self.cols as f64,
        }
    }

    fn y_edge(&self, row: usize) -> f64 {
        match row {
            0 => self.extent.ymax,
            r if r >= self.rows => self.extent.ymin,
            r => {
                self.extent.ymin
                    + self.extent.height() * (self.rows - r) as f64 / self.rows as f64
            }
        }
    }
}

fn snap_floor(v: f64) -> f64 {
    let nearest = v.round();
    if (v - nearest).abs() <= SNAP_TOLERANCE * nearest.abs().max(1.0) {
        nearest
    } else {
        v.floor()
    }
}

fn snap_ceil(v: f64) -> f64 {
    let nearest = v.round();
    if (v - nearest).abs() <= SNAP_TOLERANCE * nearest.abs().max(1.0) {
        nearest
    } else {
        v.ceil()
    }
}

fn clamp_index(v: f64, len: usize) -> usize {
    if v.is_nan() || v <= 0.0 {
        0
    } else {
        (v as usize).min(len)
    }
}
