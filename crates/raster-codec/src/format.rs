//! Format detection and the codec boundary.

use std::path::Path;

use raster_core::{Georeference, GridBuffer, RasterImage};
use serde::{Deserialize, Serialize};

use crate::ascii::AsciiGridCodec;
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::zarr::ZarrCodec;

/// Supported on-disk raster formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterFormat {
    /// Zarr V3 array directory (`.zarr`).
    Zarr,
    /// ESRI ASCII grid (`.asc`).
    AsciiGrid,
}

impl RasterFormat {
    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_str(ext)
            .ok_or_else(|| CodecError::unsupported(format!("no codec for '{}'", path.display())))
    }

    /// Parse a format name or extension (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "zarr" => Some(Self::Zarr),
            "asc" | "ascii" | "ascii_grid" | "aaigrid" => Some(Self::AsciiGrid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zarr => "zarr",
            Self::AsciiGrid => "ascii_grid",
        }
    }
}

impl std::fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reads and writes one raster format.
pub trait RasterCodec {
    fn format(&self) -> RasterFormat;

    /// Read a raster into cell values plus georeferencing.
    fn decode(&self, path: &Path) -> Result<(GridBuffer, Georeference)>;

    /// Write cell values plus georeferencing.
    fn encode(&self, grid: &GridBuffer, georef: &Georeference, path: &Path) -> Result<()>;
}

fn codec_for(format: RasterFormat, config: &CodecConfig) -> Box<dyn RasterCodec> {
    match format {
        RasterFormat::Zarr => Box::new(ZarrCodec::new(config.clone())),
        RasterFormat::AsciiGrid => Box::new(AsciiGridCodec),
    }
}

/// Decode `path`, choosing the codec from its extension.
pub fn decode(path: &Path, config: &CodecConfig) -> Result<(GridBuffer, Georeference)> {
    if !path.exists() {
        return Err(CodecError::file_not_found(path));
    }
    let format = RasterFormat::from_path(path)?;
    tracing::debug!(path = %path.display(), format = %format, "Decoding raster");
    codec_for(format, config).decode(path)
}

/// Encode to `path` in `format`.
pub fn encode(
    grid: &GridBuffer,
    georef: &Georeference,
    path: &Path,
    format: RasterFormat,
    config: &CodecConfig,
) -> Result<()> {
    config.validate().map_err(CodecError::Config)?;
    tracing::debug!(
        path = %path.display(),
        format = %format,
        bands = grid.bands(),
        rows = grid.rows(),
        cols = grid.cols(),
        "Encoding raster"
    );
    codec_for(format, config).encode(grid, georef, path)
}

/// Decode `path` straight into a [`RasterImage`].
pub fn read_raster(path: &Path, config: &CodecConfig) -> Result<RasterImage> {
    let (grid, georef) = decode(path, config)?;
    Ok(RasterImage::new(grid, georef)?)
}

/// Encode `image` to `path`, choosing the format from its extension.
pub fn write_raster(image: &RasterImage, path: &Path, config: &CodecConfig) -> Result<()> {
    let format = RasterFormat::from_path(path)?;
    encode(image.grid(), image.georef(), path, format, config)
}
