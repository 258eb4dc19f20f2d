//! Moving-window (focal) filtering.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{RasterError, Result};
use crate::grid::is_missing;
use crate::image::RasterImage;
use crate::pool::WorkerPool;
use crate::reduce::Reducer;

/// What happens to output cells whose window reaches past the grid edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgePolicy {
    /// Reduce the in-bounds part of the window.
    #[default]
    Shrink,
    /// Write no-data.
    NoData,
}

impl EdgePolicy {
    /// Parse from string (case-insensitive). Unknown values fall back to shrink.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "nodata" | "no_data" | "na" => Self::NoData,
            _ => Self::Shrink,
        }
    }
}

/// Parameters of one focal call.
#[derive(Debug, Clone)]
pub struct FocalOptions {
    pub window_rows: usize,
    pub window_cols: usize,
    pub reducer: Reducer,
    /// Bands to recompute. `None` recomputes every band.
    pub bands: Option<Vec<usize>>,
    /// `None` uses the engine's configured default.
    pub edge_policy: Option<EdgePolicy>,
}

impl FocalOptions {
    pub fn new(window_rows: usize, window_cols: usize, reducer: Reducer) -> Self {
        Self {
            window_rows,
            window_cols,
            reducer,
            bands: None,
            edge_policy: None,
        }
    }

    pub fn with_bands(mut self, bands: Vec<usize>) -> Self {
        self.bands = Some(bands);
        self
    }

    pub fn with_edge_policy(mut self, policy: EdgePolicy) -> Self {
        self.edge_policy = Some(policy);
        self
    }
}

/// Applies moving-window reductions band by band.
#[derive(Debug, Clone)]
pub struct FocalEngine {
    pool: WorkerPool,
    row_chunk_size: usize,
    default_edge_policy: EdgePolicy,
}

impl Default for FocalEngine {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            pool: WorkerPool::global(),
            row_chunk_size: config.row_chunk_size,
            default_edge_policy: config.default_edge_policy,
        }
    }
}

impl FocalEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self::with_pool(WorkerPool::from_config(config)?, config))
    }

    /// Share an existing pool with other engines.
    pub fn with_pool(pool: WorkerPool, config: &EngineConfig) -> Self {
        Self {
            pool,
            row_chunk_size: config.row_chunk_size.max(1),
            default_edge_policy: config.default_edge_policy,
        }
    }

    /// Filter `image` into a new image with the same dimensions and georeference.
    ///
    /// Bands outside `options.bands` are copied through unchanged.
    pub fn apply(&self, image: &RasterImage, options: &FocalOptions) -> Result<RasterImage> {
        let mut output = image.clone();
        self.apply_in_place(&mut output, options)?;
        Ok(output)
    }

    /// Filter the selected bands of `image` in place.
    pub fn apply_in_place(&self, image: &mut RasterImage, options: &FocalOptions) -> Result<()> {
        let (window_rows, window_cols) = (options.window_rows, options.window_cols);
        if window_rows == 0 || window_cols == 0 || window_rows % 2 == 0 || window_cols % 2 == 0 {
            return Err(RasterError::InvalidWindow {
                rows: window_rows,
                cols: window_cols,
            });
        }

        let bands = match &options.bands {
            Some(bands) => bands.clone(),
            None => (0..image.bands()).collect(),
        };
        for &band in &bands {
            image.grid().check_band(band)?;
        }

        let policy = options.edge_policy.unwrap_or(self.default_edge_policy);
        tracing::debug!(
            window_rows,
            window_cols,
            reducer = %options.reducer,
            policy = ?policy,
            bands = ?bands,
            "Applying focal filter"
        );

        for band in bands {
            let filtered = {
                let grid = image.grid();
                let window = Window {
                    src: grid.band(band)?,
                    rows: grid.rows(),
                    cols: grid.cols(),
                    half_rows: window_rows / 2,
                    half_cols: window_cols / 2,
                    nodata: grid.nodata(),
                };
                self.filter_band(&window, &options.reducer, policy, grid.fill_value())
            };
            image.grid_mut().band_mut(band)?.copy_from_slice(&filtered);
        }

        Ok(())
    }

    fn filter_band(
        &self,
        window: &Window<'_>,
        reducer: &Reducer,
        policy: EdgePolicy,
        fill: f64,
    ) -> Vec<f64> {
        let cols = window.cols;
        let chunk_rows = self.row_chunk_size;
        let mut out = vec![fill; window.rows * cols];

        self.pool.install(|| {
            out.par_chunks_mut(chunk_rows * cols)
                .enumerate()
                .for_each(|(chunk, block)| {
                    let mut scratch =
                        Vec::with_capacity((2 * window.half_rows + 1) * (2 * window.half_cols + 1));
                    for (offset, line) in block.chunks_mut(cols).enumerate() {
                        let row = chunk * chunk_rows + offset;
                        for (col, cell) in line.iter_mut().enumerate() {
                            if policy == EdgePolicy::NoData && window.crosses_edge(row, col) {
                                continue;
                            }
                            window.collect(row, col, &mut scratch);
                            if let Some(value) = reducer.reduce(&mut scratch) {
                                *cell = value;
                            }
                        }
                    }
                });
        });

        out
    }
}

/// Read-only view of one band plus the window half sizes.
struct Window<'a> {
    src: &'a [f64],
    rows: usize,
    cols: usize,
    half_rows: usize,
    half_cols: usize,
    nodata: Option<f64>,
}

impl Window<'_> {
    fn crosses_edge(&self, row: usize, col: usize) -> bool {
        row < self.half_rows
            || col < self.half_cols
            || row + self.half_rows >= self.rows
            || col + self.half_cols >= self.cols
    }

    /// Gather the valid values of the in-bounds window around (row, col).
    fn collect(&self, row: usize, col: usize, out: &mut Vec<f64>) {
        out.clear();
        let row_min = row.saturating_sub(self.half_rows);
        let row_max = (row + self.half_rows + 1).min(self.rows);
        let col_min = col.saturating_sub(self.half_cols);
        let col_max = (col + self.half_cols + 1).min(self.cols);

        for r in row_min..row_max {
            let line = &self.src[r * self.cols + col_min..r * self.cols + col_max];
            out.extend(line.iter().copied().filter(|v| !is_missing(*v, self.nodata)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::georef::Extent;

    fn image_from(data: Vec<f64>, rows: usize, cols: usize, nodata: Option<f64>) -> RasterImage {
        RasterImage::from_array(
            data,
            rows,
            cols,
            Extent::new(0.0, cols as f64, 0.0, rows as f64),
            None,
            nodata,
        )
        .unwrap()
    }

    #[test]
    fn test_sum_shrink_on_ones() {
        let image = image_from(vec![1.0; 100], 10, 10, None);
        let engine = FocalEngine::default();
        let out = engine
            .apply(&image, &FocalOptions::new(3, 3, Reducer::Sum))
            .unwrap();
        let grid = out.grid();

        assert_eq!(grid.get(0, 5, 5).unwrap(), Some(9.0));
        assert_eq!(grid.get(0, 0, 5).unwrap(), Some(6.0));
        assert_eq!(grid.get(0, 5, 9).unwrap(), Some(6.0));
        assert_eq!(grid.get(0, 0, 0).unwrap(), Some(4.0));
        assert_eq!(grid.get(0, 9, 9).unwrap(), Some(4.0));
        assert_eq!(out.georef(), image.georef());
    }

    #[test]
    fn test_nodata_edge_policy() {
        let image = image_from(vec![1.0; 25], 5, 5, Some(-9999.0));
        let engine = FocalEngine::default();
        let options = FocalOptions::new(3, 3, Reducer::Mean).with_edge_policy(EdgePolicy::NoData);
        let out = engine.apply(&image, &options).unwrap();

        assert_eq!(out.grid().get(0, 0, 0).unwrap(), None);
        assert_eq!(out.grid().get_raw(0, 4, 2).unwrap(), -9999.0);
        assert_eq!(out.grid().get(0, 2, 2).unwrap(), Some(1.0));
    }

    #[test]
    fn test_invalid_windows() {
        let image = image_from(vec![1.0; 9], 3, 3, None);
        let engine = FocalEngine::default();
        for (rows, cols) in [(2, 3), (3, 4), (0, 1), (1, 0)] {
            assert!(matches!(
                engine.apply(&image, &FocalOptions::new(rows, cols, Reducer::Sum)),
                Err(RasterError::InvalidWindow { .. })
            ));
        }
    }

    #[test]
    fn test_all_nodata_window_yields_nodata() {
        let mut data = vec![f64::NAN; 25];
        data[0] = 5.0;
        let image = image_from(data, 5, 5, None);
        let engine = FocalEngine::default();
        let out = engine
            .apply(&image, &FocalOptions::new(3, 3, Reducer::Max))
            .unwrap();

        assert_eq!(out.grid().get(0, 1, 1).unwrap(), Some(5.0));
        assert_eq!(out.grid().get(0, 3, 3).unwrap(), None);
    }

    #[test]
    fn test_band_subset_passes_others_through() {
        let data = vec![vec![1.0; 9], (0..9).map(|v| v as f64).collect()];
        let image =
            RasterImage::from_bands(data, 3, 3, Extent::new(0.0, 3.0, 0.0, 3.0), None, None)
                .unwrap();
        let engine = FocalEngine::default();
        let options = FocalOptions::new(3, 3, Reducer::Sum).with_bands(vec![0]);
        let out = engine.apply(&image, &options).unwrap();

        assert_eq!(out.grid().get(0, 1, 1).unwrap(), Some(9.0));
        assert_eq!(out.grid().band(1).unwrap(), image.grid().band(1).unwrap());

        let bad = FocalOptions::new(3, 3, Reducer::Sum).with_bands(vec![2]);
        assert!(matches!(
            engine.apply(&image, &bad),
            Err(RasterError::BandOutOfRange { band: 2, .. })
        ));
    }

    #[test]
    fn test_small_row_chunks_match_single_chunk() {
        let data: Vec<f64> = (0..12 * 7).map(|v| ((v * 37) % 11) as f64).collect();
        let image = image_from(data, 12, 7, None);

        let config = EngineConfig {
            row_chunk_size: 1,
            worker_threads: Some(3),
            ..Default::default()
        };
        let chunked = FocalEngine::new(&config).unwrap();
        let options = FocalOptions::new(5, 3, Reducer::Median);

        let a = chunked.apply(&image, &options).unwrap();
        let b = FocalEngine::default().apply(&image, &options).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_in_place_and_custom_reducer() {
        let mut image = image_from(vec![2.0; 16], 4, 4, None);
        let engine = FocalEngine::default();
        let count = Reducer::custom(|values| values.len() as f64);
        engine
            .apply_in_place(&mut image, &FocalOptions::new(3, 1, count))
            .unwrap();

        assert_eq!(image.grid().get(0, 0, 0).unwrap(), Some(2.0));
        assert_eq!(image.grid().get(0, 1, 0).unwrap(), Some(3.0));
    }

    #[test]
    fn test_edge_policy_from_str() {
        assert_eq!(EdgePolicy::from_str("NODATA"), EdgePolicy::NoData);
        assert_eq!(EdgePolicy::from_str("shrink"), EdgePolicy::Shrink);
        assert_eq!(EdgePolicy::from_str("other"), EdgePolicy::Shrink);
    }
}
