//! Error types for raster operations.

use thiserror::Error;

/// Errors that can occur while building or transforming rasters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    /// A (band, row, col) index lies outside the grid.
    #[error("cell ({band}, {row}, {col}) is outside grid of {bands}x{rows}x{cols}")]
    OutOfBounds {
        band: usize,
        row: usize,
        col: usize,
        bands: usize,
        rows: usize,
        cols: usize,
    },

    /// A band index does not exist.
    #[error("band {band} does not exist (raster has {bands} bands)")]
    BandOutOfRange { band: usize, bands: usize },

    /// A coordinate lies outside the georeferenced area.
    #[error("coordinate ({x}, {y}) is outside the raster extent")]
    OutOfExtent { x: f64, y: f64 },

    /// A crop or extraction has no overlap with the raster.
    #[error("requested extent does not intersect the raster: {0}")]
    EmptyIntersection(String),

    /// Focal window dimensions must be positive and odd.
    #[error("invalid focal window {rows}x{cols}: dimensions must be positive odd integers")]
    InvalidWindow { rows: usize, cols: usize },

    /// The operation is not supported with the given collaborators or options.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Arrays or bands with differing shapes were combined.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: String, found: String },

    /// Grids must have at least one band, row and column.
    #[error("invalid grid dimensions {bands}x{rows}x{cols}")]
    InvalidDimensions {
        bands: usize,
        rows: usize,
        cols: usize,
    },

    /// The extent or resolution is not usable.
    #[error("invalid georeference: {0}")]
    InvalidGeoreference(String),

    /// Aggregation factors must be positive.
    #[error("invalid aggregation factor {rows}x{cols}")]
    InvalidFactor { rows: usize, cols: usize },

    /// Patch sizes and strides must be positive.
    #[error("invalid patch shape: {0}")]
    InvalidPatch(String),

    /// The worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RasterError {
    /// Create an OutOfBounds error from a cell index and grid dimensions.
    pub fn out_of_bounds(
        (band, row, col): (usize, usize, usize),
        (bands, rows, cols): (usize, usize, usize),
    ) -> Self {
        Self::OutOfBounds {
            band,
            row,
            col,
            bands,
            rows,
            cols,
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an UnsupportedOperation error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOperation(msg.into())
    }

    /// Create an InvalidGeoreference error.
    pub fn invalid_georeference(msg: impl Into<String>) -> Self {
        Self::InvalidGeoreference(msg.into())
    }
}

impl From<rayon::ThreadPoolBuildError> for RasterError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(err.to_string())
    }
}

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
