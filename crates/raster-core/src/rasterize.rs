//! Burning polygons into raster cells.
//!
//! Coverage is computed per polygon in parallel, then written serially in
//! input order so that overlapping polygons keep last-write-wins semantics
//! regardless of scheduling.

use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::coverage::{cells_by_center, CellCoverage};
use crate::error::{RasterError, Result};
use crate::geometry::GeometryProvider;
use crate::georef::Georeference;
use crate::image::RasterImage;
use crate::pool::WorkerPool;

/// Parameters of one rasterize call.
#[derive(Debug, Clone, Default)]
pub struct RasterizeOptions {
    /// One value per polygon. `None` burns polygon `i` as `i + 1`.
    pub values: Option<Vec<f64>>,
    /// Target band.
    pub band: usize,
    /// When set, the whole band is reset to this value first.
    pub background: Option<f64>,
}

impl RasterizeOptions {
    pub fn with_values(values: Vec<f64>) -> Self {
        Self {
            values: Some(values),
            ..Default::default()
        }
    }

    pub fn band(mut self, band: usize) -> Self {
        self.band = band;
        self
    }

    pub fn background(mut self, value: f64) -> Self {
        self.background = Some(value);
        self
    }
}

/// Outcome of a rasterize call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RasterizeSummary {
    pub polygons: usize,
    /// Cell writes, counting overwritten cells once per polygon.
    pub cells_written: usize,
    /// Polygons that covered no cell center.
    pub empty_polygons: usize,
}

/// Converts polygons into cell values.
pub struct RasterizeEngine<G: GeometryProvider> {
    provider: G,
    pool: WorkerPool,
    polygon_chunk_size: usize,
}

impl<G: GeometryProvider> RasterizeEngine<G> {
    pub fn new(provider: G, config: &EngineConfig) -> Result<Self> {
        let pool = WorkerPool::from_config(config)?;
        Ok(Self::with_pool(provider, pool, config))
    }

    pub fn with_pool(provider: G, pool: WorkerPool, config: &EngineConfig) -> Self {
        Self {
            provider,
            pool,
            polygon_chunk_size: config.polygon_chunk_size.max(1),
        }
    }

    pub fn provider(&self) -> &G {
        &self.provider
    }

    /// Burn `polygons` into `options.band` of `image` in place.
    ///
    /// A cell is covered when its center lies inside the polygon. Cells no
    /// polygon covers keep their value unless a background is given.
    pub fn rasterize(
        &self,
        image: &mut RasterImage,
        polygons: &[G::Polygon],
        options: &RasterizeOptions,
    ) -> Result<RasterizeSummary> {
        image.grid().check_band(options.band)?;
        if let Some(values) = &options.values {
            if values.len() != polygons.len() {
                return Err(RasterError::dimension_mismatch(
                    format!("{} field values", polygons.len()),
                    format!("{} field values", values.len()),
                ));
            }
        }

        tracing::debug!(
            polygons = polygons.len(),
            band = options.band,
            background = ?options.background,
            "Rasterizing polygons"
        );

        let coverage = self.coverage(image.georef(), polygons);

        let cols = image.cols();
        let band = image.grid_mut().band_mut(options.band)?;
        if let Some(background) = options.background {
            band.fill(background);
        }

        let mut summary = RasterizeSummary {
            polygons: polygons.len(),
            ..Default::default()
        };
        for (index, cells) in coverage.iter().enumerate() {
            let value = match &options.values {
                Some(values) => values[index],
                None => (index + 1) as f64,
            };
            if cells.is_empty() {
                summary.empty_polygons += 1;
            }
            for cell in cells {
                band[cell.row * cols + cell.col] = value;
            }
            summary.cells_written += cells.len();
        }

        tracing::debug!(
            cells_written = summary.cells_written,
            empty_polygons = summary.empty_polygons,
            "Rasterized polygons"
        );

        Ok(summary)
    }

    /// Rasterize onto a fresh single-band image on `template`.
    ///
    /// Uncovered cells hold the background, or no-data when none is given.
    pub fn rasterize_new(
        &self,
        template: &Georeference,
        polygons: &[G::Polygon],
        options: &RasterizeOptions,
        nodata: Option<f64>,
    ) -> Result<RasterImage> {
        let fill = options.background.unwrap_or(nodata.unwrap_or(f64::NAN));
        let mut image = RasterImage::filled(template.clone(), 1, fill, nodata)?;
        let options = RasterizeOptions {
            band: 0,
            ..options.clone()
        };
        self.rasterize(&mut image, polygons, &options)?;
        Ok(image)
    }

    fn coverage(&self, georef: &Georeference, polygons: &[G::Polygon]) -> Vec<Vec<CellCoverage>> {
        let provider = &self.provider;
        self.pool.install(|| {
            polygons
                .par_iter()
                .with_min_len(self.polygon_chunk_size)
                .map(|polygon| cells_by_center(provider, georef, polygon))
                .collect()
        })
    }
}
