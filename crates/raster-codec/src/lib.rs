//! Raster file codecs
//!
//! Converts between files on disk and the plain cell arrays plus
//! georeferencing used by `raster-core`:
//!
//! - **Zarr V3**: multi-band `[band, row, col]` Float64 or Float32 arrays
//!   with optional Blosc compression, georeferencing stored in the array
//!   attributes
//! - **ESRI ASCII grid**: single-band text grids
//!
//! # Example
//!
//! ```ignore
//! use raster_codec::{read_raster, write_raster, CodecConfig};
//!
//! let config = CodecConfig::default();
//! let image = read_raster(Path::new("dem.asc"), &config)?;
//! write_raster(&image, Path::new("dem.zarr"), &config)?;
//! ```

pub mod ascii;
pub mod config;
pub mod error;
pub mod format;
pub mod zarr;

// Re-export commonly used types at crate root
pub use ascii::AsciiGridCodec;
pub use config::{CodecConfig, Compressor, SampleType};
pub use error::{CodecError, Result};
pub use format::{decode, encode, read_raster, write_raster, RasterCodec, RasterFormat};
pub use zarr::ZarrCodec;
