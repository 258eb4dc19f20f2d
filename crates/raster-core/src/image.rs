//! Georeferenced multi-band rasters and their whole-image transformations.
//!
//! Every transformation here is pure: it borrows the source image and
//! returns a newly owned [`RasterImage`].

use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::error::{RasterError, Result};
use crate::georef::{Extent, Georeference};
use crate::grid::{is_missing, GridBuffer};
use crate::pool::WorkerPool;
use crate::reduce::Reducer;

/// A grid of cell values together with its georeferencing.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    grid: GridBuffer,
    georef: Georeference,
}

impl RasterImage {
    /// Combine a grid with a georeference of matching dimensions.
    pub fn new(grid: GridBuffer, georef: Georeference) -> Result<Self> {
        if grid.rows() != georef.rows() || grid.cols() != georef.cols() {
            return Err(RasterError::dimension_mismatch(
                format!("{}x{} cells", georef.rows(), georef.cols()),
                format!("{}x{} cells", grid.rows(), grid.cols()),
            ));
        }
        Ok(Self { grid, georef })
    }

    /// Build a single-band image from a row-major array.
    pub fn from_array(
        data: Vec<f64>,
        rows: usize,
        cols: usize,
        extent: Extent,
        crs: Option<String>,
        nodata: Option<f64>,
    ) -> Result<Self> {
        let grid = GridBuffer::from_vec(data, 1, rows, cols, nodata)?;
        let georef = Georeference::new(extent, rows, cols, crs)?;
        Self::new(grid, georef)
    }

    /// Build a multi-band image from same-shaped row-major arrays.
    pub fn from_bands(
        bands: Vec<Vec<f64>>,
        rows: usize,
        cols: usize,
        extent: Extent,
        crs: Option<String>,
        nodata: Option<f64>,
    ) -> Result<Self> {
        let grid = GridBuffer::from_bands(bands, rows, cols, nodata)?;
        let georef = Georeference::new(extent, rows, cols, crs)?;
        Self::new(grid, georef)
    }

    /// An image of `bands` bands where every cell holds `fill`.
    pub fn filled(georef: Georeference, bands: usize, fill: f64, nodata: Option<f64>) -> Result<Self> {
        let grid = GridBuffer::new(bands, georef.rows(), georef.cols(), fill, nodata)?;
        Self::new(grid, georef)
    }

    pub fn grid(&self) -> &GridBuffer {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut GridBuffer {
        &mut self.grid
    }

    pub fn georef(&self) -> &Georeference {
        &self.georef
    }

    pub fn extent(&self) -> &Extent {
        self.georef.extent()
    }

    pub fn bands(&self) -> usize {
        self.grid.bands()
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    pub fn into_parts(self) -> (GridBuffer, Georeference) {
        (self.grid, self.georef)
    }

    /// Value of `band` at a map coordinate; `None` for no-data.
    pub fn value_at(&self, x: f64, y: f64, band: usize) -> Result<Option<f64>> {
        let (row, col) = self.georef.cell_index(x, y)?;
        self.grid.get(band, row, col)
    }

    /// Copy the cells covering `extent`.
    ///
    /// The output extent is the true bounds of the selected cells, never the
    /// requested extent verbatim, so the result stays aligned with this grid.
    pub fn crop(&self, extent: &Extent) -> Result<RasterImage> {
        let window = self.georef.sub_extent_indices(extent)?;

        tracing::debug!(
            requested = ?extent,
            rows = window.rows(),
            cols = window.cols(),
            "Cropping raster"
        );

        let grid = self
            .grid
            .sub_block(window.row_start, window.col_start, window.rows(), window.cols())?;
        let georef = self.georef.window(&window)?;
        Self::new(grid, georef)
    }

    /// Reduce blocks of `factor_rows x factor_cols` cells into one cell.
    ///
    /// Trailing blocks that do not fit the factor are reduced from the cells
    /// they do have. The output keeps the north-west corner and grows
    /// east/south to whole output cells. Runs on the global rayon pool; see
    /// [`aggregate_with`](Self::aggregate_with) to pick the pool.
    pub fn aggregate(
        &self,
        factor_rows: usize,
        factor_cols: usize,
        reducer: &Reducer,
    ) -> Result<RasterImage> {
        self.aggregate_with(
            factor_rows,
            factor_cols,
            reducer,
            &WorkerPool::global(),
            EngineConfig::default().row_chunk_size,
        )
    }

    /// [`aggregate`](Self::aggregate) on `pool`, `row_chunk_size` output rows per task.
    pub fn aggregate_with(
        &self,
        factor_rows: usize,
        factor_cols: usize,
        reducer: &Reducer,
        pool: &WorkerPool,
        row_chunk_size: usize,
    ) -> Result<RasterImage> {
        if factor_rows == 0 || factor_cols == 0 {
            return Err(RasterError::InvalidFactor {
                rows: factor_rows,
                cols: factor_cols,
            });
        }
        if row_chunk_size == 0 {
            return Err(RasterError::Config("row_chunk_size must be > 0".to_string()));
        }

        let (bands, rows, cols) = self.grid.dims();
        let out_rows = rows.div_ceil(factor_rows);
        let out_cols = cols.div_ceil(factor_cols);

        tracing::debug!(
            factor_rows,
            factor_cols,
            reducer = %reducer,
            out_rows,
            out_cols,
            threads = pool.threads(),
            "Aggregating raster"
        );

        let georef = self.aggregate_georef(factor_rows, factor_cols, out_rows, out_cols)?;
        let nodata = self.grid.nodata();
        let fill = self.grid.fill_value();

        let mut data = vec![fill; bands * out_rows * out_cols];
        for (band, out_band) in data.chunks_mut(out_rows * out_cols).enumerate() {
            let src = self.grid.band(band)?;
            pool.install(|| {
                out_band
                    .par_chunks_mut(row_chunk_size * out_cols)
                    .enumerate()
                    .for_each(|(chunk, block)| {
                        let mut scratch = Vec::with_capacity(factor_rows * factor_cols);
                        for (offset, out_line) in block.chunks_mut(out_cols).enumerate() {
                            let row_start = (chunk * row_chunk_size + offset) * factor_rows;
                            let row_end = (row_start + factor_rows).min(rows);

                            for (out_col, cell) in out_line.iter_mut().enumerate() {
                                let col_start = out_col * factor_cols;
                                let col_end = (col_start + factor_cols).min(cols);

                                scratch.clear();
                                for row in row_start..row_end {
                                    scratch.extend(
                                        src[row * cols + col_start..row * cols + col_end]
                                            .iter()
                                            .copied()
                                            .filter(|v| !is_missing(*v, nodata)),
                                    );
                                }
                                if let Some(value) = reducer.reduce(&mut scratch) {
                                    *cell = value;
                                }
                            }
                        }
                    });
            });
        }

        let grid = GridBuffer::from_vec(data, bands, out_rows, out_cols, nodata)?;
        Self::new(grid, georef)
    }

    fn aggregate_georef(
        &self,
        factor_rows: usize,
        factor_cols: usize,
        out_rows: usize,
        out_cols: usize,
    ) -> Result<Georeference> {
        let extent = self.georef.extent();
        let (xres, yres) = self.georef.resolution();

        let xmax = if out_cols * factor_cols == self.cols() {
            extent.xmax
        } else {
            extent.xmin + (out_cols * factor_cols) as f64 * xres
        };
        let ymin = if out_rows * factor_rows == self.rows() {
            extent.ymin
        } else {
            extent.ymax - (out_rows * factor_rows) as f64 * yres
        };

        Georeference::new(
            Extent::new(extent.xmin, xmax, ymin, extent.ymax),
            out_rows,
            out_cols,
            self.georef.crs().map(str::to_string),
        )
    }
}
