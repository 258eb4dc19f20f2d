//! Reducing the cells under each polygon to one value per band.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::coverage::{cells_by_area, cells_by_center, CellCoverage};
use crate::error::{RasterError, Result};
use crate::geometry::GeometryProvider;
use crate::image::RasterImage;
use crate::pool::WorkerPool;
use crate::reduce::Reducer;

/// Parameters of one extract call.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub reducer: Reducer,
    /// Weight cells by covered area instead of testing their centers.
    pub weighted: bool,
    /// Bands to summarize. `None` summarizes every band.
    pub bands: Option<Vec<usize>>,
}

impl ExtractOptions {
    pub fn new(reducer: Reducer) -> Self {
        Self {
            reducer,
            ..Default::default()
        }
    }

    pub fn weighted(mut self) -> Self {
        self.weighted = true;
        self
    }

    pub fn with_bands(mut self, bands: Vec<usize>) -> Self {
        self.bands = Some(bands);
        self
    }
}

/// Summary of one polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResult {
    /// Position of the polygon in the input.
    pub index: usize,
    /// One entry per requested band; `None` where no valid cell was covered.
    pub values: Vec<Option<f64>>,
    /// Number of cells the polygon covers, valid or not.
    pub cells: usize,
}

/// Summarizes raster values per polygon.
pub struct ExtractEngine<G: GeometryProvider> {
    provider: G,
    pool: WorkerPool,
    polygon_chunk_size: usize,
}

impl<G: GeometryProvider> ExtractEngine<G> {
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

    /// One result per polygon, in input order.
    ///
    /// Polygons are independent of one another, so they are evaluated in
    /// parallel; results do not depend on scheduling.
    pub fn extract(
        &self,
        image: &RasterImage,
        polygons: &[G::Polygon],
        options: &ExtractOptions,
    ) -> Result<Vec<ExtractResult>> {
        if options.weighted {
            if !self.provider.supports_intersection_area() {
                return Err(RasterError::unsupported(
                    "weighted extraction requires intersection areas from the geometry provider",
                ));
            }
            if !options.reducer.supports_weights() {
                return Err(RasterError::unsupported(format!(
                    "reducer '{}' cannot be used for weighted extraction",
                    options.reducer
                )));
            }
        }

        let bands = match &options.bands {
            Some(bands) => bands.clone(),
            None => (0..image.bands()).collect(),
        };
        for &band in &bands {
            image.grid().check_band(band)?;
        }

        tracing::debug!(
            polygons = polygons.len(),
            reducer = %options.reducer,
            weighted = options.weighted,
            bands = ?bands,
            "Extracting polygon summaries"
        );

        self.pool.install(|| {
            polygons
                .par_iter()
                .with_min_len(self.polygon_chunk_size)
                .enumerate()
                .map(|(index, polygon)| {
                    let cells = self.covered_cells(image, polygon, options.weighted)?;
                    let values = bands
                        .iter()
                        .map(|&band| summarize(image, band, &cells, options))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(ExtractResult {
                        index,
                        values,
                        cells: cells.len(),
                    })
                })
                .collect()
        })
    }

    /// Cells a polygon covers: by center, or by area when `weighted`.
    pub fn covered_cells(
        &self,
        image: &RasterImage,
        polygon: &G::Polygon,
        weighted: bool,
    ) -> Result<Vec<CellCoverage>> {
        if weighted {
            cells_by_area(&self.provider, image.georef(), polygon)
        } else {
            Ok(cells_by_center(&self.provider, image.georef(), polygon))
        }
    }
}

fn summarize(
    image: &RasterImage,
    band: usize,
    cells: &[CellCoverage],
    options: &ExtractOptions,
) -> Result<Option<f64>> {
    let grid = image.grid();
    let src = grid.band(band)?;
    let cols = grid.cols();

    let mut values = Vec::with_capacity(cells.len());
    let mut weights = Vec::with_capacity(cells.len());
    for cell in cells {
        let value = src[cell.row * cols + cell.col];
        if !grid.is_nodata(value) {
            values.push(value);
            weights.push(cell.weight);
        }
    }

    if options.weighted {
        options.reducer.reduce_weighted(&values, &weights)
    } else {
        Ok(options.reducer.reduce(&mut values))
    }
}
