//! Configuration for the raster codecs.
//!
//! Only the Zarr writer has knobs; the ASCII grid layout is fixed by the
//! format. Decoding ignores the configuration: chunking, element type and
//! compression are read back from the array metadata.

use serde::{Deserialize, Serialize};

/// How rasters are laid out when written as Zarr arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Rows and columns per chunk.
    pub chunk_size: usize,

    /// Bands per chunk. 1 keeps bands independently readable; larger
    /// values group bands that are always read together.
    pub band_chunk: usize,

    /// Element type of the stored array.
    pub sample_type: SampleType,

    /// Blosc compressor applied to every chunk.
    pub compressor: Compressor,

    /// Blosc compression level (1-9). Ignored without a compressor.
    pub compression_level: u8,

    /// Byte-shuffle elements before compressing.
    pub shuffle: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            band_chunk: 1,
            sample_type: SampleType::Float64,
            compressor: Compressor::Zstd,
            compression_level: 1,
            shuffle: true,
        }
    }
}

impl CodecConfig {
    /// Load configuration from `RASTER_ZARR_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from a key lookup, falling back to defaults
    /// for missing or unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(size) = lookup("RASTER_ZARR_CHUNK_SIZE").and_then(|v| v.parse().ok()) {
            config.chunk_size = size;
        }

        if let Some(bands) = lookup("RASTER_ZARR_BAND_CHUNK").and_then(|v| v.parse().ok()) {
            config.band_chunk = bands;
        }

        if let Some(val) = lookup("RASTER_ZARR_SAMPLE_TYPE") {
            config.sample_type = SampleType::from_str(&val);
        }

        if let Some(val) = lookup("RASTER_ZARR_COMPRESSOR") {
            config.compressor = Compressor::from_str(&val);
        }

        if let Some(level) = lookup("RASTER_ZARR_COMPRESSION_LEVEL").and_then(|v| v.parse().ok()) {
            config.compression_level = level;
        }

        if let Some(val) = lookup("RASTER_ZARR_SHUFFLE") {
            config.shuffle = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }

        if self.band_chunk == 0 {
            return Err("band_chunk must be > 0".to_string());
        }

        if self.compressor != Compressor::None && !(1..=9).contains(&self.compression_level) {
            return Err("compression_level must be 1-9".to_string());
        }

        Ok(())
    }
}

/// Element type written to Zarr arrays. Values are always `f64` in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    /// Lossless.
    #[default]
    Float64,
    /// Half the size on disk; values are rounded to single precision.
    Float32,
}

impl SampleType {
    /// Parse from string (case-insensitive). Unknown values fall back to float64.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "float32" | "f32" => Self::Float32,
            _ => Self::Float64,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float64 => "float64",
            Self::Float32 => "float32",
        }
    }

    /// Bytes per element.
    pub fn size(&self) -> usize {
        match self {
            Self::Float64 => std::mem::size_of::<f64>(),
            Self::Float32 => std::mem::size_of::<f32>(),
        }
    }
}

/// Blosc compressor for Zarr chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compressor {
    /// Raw chunks.
    None,
    /// Fast, lighter compression.
    Lz4,
    /// Better ratio for smooth fields.
    #[default]
    Zstd,
}

impl Compressor {
    /// Parse from string (case-insensitive). Unknown values fall back to zstd.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" | "off" => Self::None,
            "lz4" | "blosc_lz4" => Self::Lz4,
            _ => Self::Zstd,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
        }
    }
}

impl std::fmt::Display for Compressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
