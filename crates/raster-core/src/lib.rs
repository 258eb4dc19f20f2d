//! In-memory multi-band raster engine
//!
//! A [`RasterImage`] pairs a dense band-major [`GridBuffer`] with a
//! [`Georeference`] that maps cell indices to world coordinates. On top of
//! that the crate provides:
//!
//! - **Geometry**: cropping to an extent and block aggregation
//! - **Focal filtering**: moving-window reductions via [`FocalEngine`]
//! - **Rasterization**: burning polygons into cells via [`RasterizeEngine`]
//! - **Extraction**: per-polygon summaries via [`ExtractEngine`]
//! - **Patching**: splitting into fixed-size patches and reassembling
//!
//! # Architecture
//!
//! ```text
//! RasterImage ─┬─► crop / aggregate / value_at
//!              │
//!              ├─► FocalEngine ─────► rows in parallel (WorkerPool)
//!              │
//!              ├─► RasterizeEngine ─► coverage in parallel, writes in order
//!              │        │
//!              ├─► ExtractEngine ───► polygons in parallel, results in order
//!              │        │
//!              │        └─► GeometryProvider (point-in-polygon, bbox, area)
//!              │
//!              └─► to_patches / from_patches
//! ```
//!
//! No-data cells (the sentinel, or NaN) are skipped by every reduction.
//!
//! # Example
//!
//! ```ignore
//! use raster_core::{Extent, FocalEngine, FocalOptions, RasterImage, Reducer};
//!
//! let image = RasterImage::from_array(data, 10, 10, Extent::new(0.0, 1.0, 0.0, 1.0), None, None)?;
//! let smoothed = FocalEngine::default().apply(&image, &FocalOptions::new(3, 3, Reducer::Mean))?;
//! let coarse = smoothed.aggregate(2, 2, &Reducer::Sum)?;
//! ```

pub mod config;
pub mod coverage;
pub mod error;
pub mod extract;
pub mod focal;
pub mod geometry;
pub mod georef;
pub mod grid;
pub mod image;
pub mod patches;
pub mod pool;
pub mod rasterize;
pub mod reduce;

// Re-export commonly used types at crate root
pub use config::EngineConfig;
pub use coverage::{cells_by_area, cells_by_center, CellCoverage};
pub use error::{RasterError, Result};
pub use extract::{ExtractEngine, ExtractOptions, ExtractResult};
pub use focal::{EdgePolicy, FocalEngine, FocalOptions};
pub use geometry::{polygon_from_rings, GeoProvider, GeometryProvider};
pub use georef::{CellWindow, Extent, Georeference};
pub use grid::{cell_count, GridBuffer};
pub use image::RasterImage;
pub use patches::{reconstruct, Patch, PatchIter, PatchShape, Patches};
pub use pool::WorkerPool;
pub use rasterize::{RasterizeEngine, RasterizeOptions, RasterizeSummary};
pub use reduce::{ReduceFn, Reducer};
