//! Banded cell storage.
//!
//! A [`GridBuffer`] owns the values of every band of a raster in a single
//! flat vector, band-major and then row-major (top row first). All bands
//! share the same row and column count.
//!
//! Missingness is a property of the stored value, not a separate mask. A
//! computed value that happens to equal the sentinel (for example a sum of
//! exactly -9999 with `nodata = Some(-9999.0)`) is indistinguishable from
//! no-data once written. Pick a sentinel outside the range of results.

use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};

/// Multi-band numeric cell data with an optional no-data sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridBuffer {
    bands: usize,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
    nodata: Option<f64>,
}

impl GridBuffer {
    /// Create a grid with every cell set to `fill`.
    pub fn new(
        bands: usize,
        rows: usize,
        cols: usize,
        fill: f64,
        nodata: Option<f64>,
    ) -> Result<Self> {
        let len = cell_count(bands, rows, cols)?;
        Ok(Self {
            bands,
            rows,
            cols,
            data: vec![fill; len],
            nodata,
        })
    }

    /// Create a grid where every cell is no-data.
    pub fn empty(bands: usize, rows: usize, cols: usize, nodata: Option<f64>) -> Result<Self> {
        Self::new(bands, rows, cols, nodata.unwrap_or(f64::NAN), nodata)
    }

    /// Wrap an existing band-major vector.
    pub fn from_vec(
        data: Vec<f64>,
        bands: usize,
        rows: usize,
        cols: usize,
        nodata: Option<f64>,
    ) -> Result<Self> {
        let expected = cell_count(bands, rows, cols)?;
        if data.len() != expected {
            return Err(RasterError::dimension_mismatch(
                format!("{} cells ({}x{}x{})", expected, bands, rows, cols),
                format!("{} cells", data.len()),
            ));
        }
        Ok(Self {
            bands,
            rows,
            cols,
            data,
            nodata,
        })
    }

    /// Stack several row-major arrays of identical shape as bands.
    pub fn from_bands(
        bands: Vec<Vec<f64>>,
        rows: usize,
        cols: usize,
        nodata: Option<f64>,
    ) -> Result<Self> {
        let cells = cell_count(1, rows, cols)?;
        cell_count(bands.len(), rows, cols)?;
        if let Some((idx, band)) = bands.iter().enumerate().find(|(_, b)| b.len() != cells) {
            return Err(RasterError::dimension_mismatch(
                format!("{} cells per band ({}x{})", cells, rows, cols),
                format!("{} cells in band {}", band.len(), idx),
            ));
        }
        let count = bands.len();
        let data = bands.into_iter().flatten().collect();
        Ok(Self {
            bands: count,
            rows,
            cols,
            data,
            nodata,
        })
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Dimensions as (bands, rows, cols).
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.bands, self.rows, self.cols)
    }

    /// Number of cells in one band.
    pub fn band_len(&self) -> usize {
        self.rows * self.cols
    }

    /// The configured no-data sentinel, if any.
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Replace the no-data sentinel. Cell values are left untouched.
    pub fn set_nodata(&mut self, nodata: Option<f64>) {
        self.nodata = nodata;
    }

    /// The value written to cells that hold no data.
    pub fn fill_value(&self) -> f64 {
        self.nodata.unwrap_or(f64::NAN)
    }

    /// Check whether `value` marks a missing cell.
    ///
    /// NaN never carries data. A NaN sentinel therefore matches through the
    /// NaN test, any other sentinel through exact equality.
    pub fn is_nodata(&self, value: f64) -> bool {
        is_missing(value, self.nodata)
    }

    /// Value at a cell, `None` when the cell holds no data.
    pub fn get(&self, band: usize, row: usize, col: usize) -> Result<Option<f64>> {
        let value = self.get_raw(band, row, col)?;
        Ok((!self.is_nodata(value)).then_some(value))
    }

    /// Stored value at a cell, including sentinels.
    pub fn get_raw(&self, band: usize, row: usize, col: usize) -> Result<f64> {
        let idx = self.index(band, row, col)?;
        Ok(self.data[idx])
    }

    /// Write a value. Writing the sentinel marks the cell as missing.
    pub fn set(&mut self, band: usize, row: usize, col: usize, value: f64) -> Result<()> {
        let idx = self.index(band, row, col)?;
        self.data[idx] = value;
        Ok(())
    }

    /// Mark a cell as missing.
    pub fn set_nodata_at(&mut self, band: usize, row: usize, col: usize) -> Result<()> {
        let fill = self.fill_value();
        self.set(band, row, col, fill)
    }

    /// Row-major values of one band.
    pub fn band(&self, band: usize) -> Result<&[f64]> {
        self.check_band(band)?;
        let len = self.band_len();
        Ok(&self.data[band * len..(band + 1) * len])
    }

    /// Mutable row-major values of one band.
    pub fn band_mut(&mut self, band: usize) -> Result<&mut [f64]> {
        self.check_band(band)?;
        let len = self.band_len();
        Ok(&mut self.data[band * len..(band + 1) * len])
    }

    /// All values, band-major.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Copy of the sub-block `rows x cols` starting at (`row0`, `col0`), all bands.
    pub fn sub_block(
        &self,
        row0: usize,
        col0: usize,
        rows: usize,
        cols: usize,
    ) -> Result<GridBuffer> {
        if rows == 0 || cols == 0 {
            return Err(RasterError::InvalidDimensions {
                bands: self.bands,
                rows,
                cols,
            });
        }
        if row0 + rows > self.rows || col0 + cols > self.cols {
            return Err(RasterError::out_of_bounds(
                (0, row0 + rows - 1, col0 + cols - 1),
                self.dims(),
            ));
        }

        let mut data = Vec::with_capacity(self.bands * rows * cols);
        for band in 0..self.bands {
            let base = band * self.band_len();
            for row in row0..row0 + rows {
                let start = base + row * self.cols + col0;
                data.extend_from_slice(&self.data[start..start + cols]);
            }
        }

        Ok(GridBuffer {
            bands: self.bands,
            rows,
            cols,
            data,
            nodata: self.nodata,
        })
    }

    pub(crate) fn check_band(&self, band: usize) -> Result<()> {
        if band >= self.bands {
            return Err(RasterError::BandOutOfRange {
                band,
                bands: self.bands,
            });
        }
        Ok(())
    }

    fn index(&self, band: usize, row: usize, col: usize) -> Result<usize> {
        if band >= self.bands || row >= self.rows || col >= self.cols {
            return Err(RasterError::out_of_bounds((band, row, col), self.dims()));
        }
        Ok(band * self.band_len() + row * self.cols + col)
    }
}

/// No-data test shared by engines that work on raw band slices.
#[inline]
pub(crate) fn is_missing(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    matches!(nodata, Some(nd) if value == nd)
}

/// Total number of cells, rejecting empty shapes and counts that overflow `usize`.
pub fn cell_count(bands: usize, rows: usize, cols: usize) -> Result<usize> {
    if bands == 0 || rows == 0 || cols == 0 {
        return Err(RasterError::InvalidDimensions { bands, rows, cols });
    }
    bands
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .ok_or(RasterError::InvalidDimensions { bands, rows, cols })
}
