//! Zarr V3 codec.
//!
//! A raster is stored as one 3-D `[band, row, col]` array at the store
//! root, Float64 or Float32 as configured. Georeferencing lives in the array attributes:
//!
//! ```text
//! {
//!   "extent": [xmin, xmax, ymin, ymax],
//!   "crs": "EPSG:4326" | null,
//!   "nodata": -9999.0 | null
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use raster_core::{Extent, Georeference, GridBuffer};
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::codec::BytesToBytesCodecTraits;
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use crate::config::{CodecConfig, Compressor, SampleType};
use crate::error::{CodecError, Result};
use crate::format::{RasterCodec, RasterFormat};

/// Reads and writes Zarr V3 raster arrays on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct ZarrCodec {
    config: CodecConfig,
}

impl ZarrCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// Blosc stage for the configured compressor, `None` for raw chunks.
    fn blosc_codec(&self) -> Result<Option<Arc<dyn BytesToBytesCodecTraits>>> {
        let config = &self.config;
        let compressor = match config.compressor {
            Compressor::None => return Ok(None),
            Compressor::Lz4 => BloscCompressor::LZ4,
            Compressor::Zstd => BloscCompressor::Zstd,
        };

        let level = BloscCompressionLevel::try_from(config.compression_level).map_err(|_| {
            CodecError::Config(format!("invalid compression level {}", config.compression_level))
        })?;

        // Shuffling needs the element width of the stored type
        let (shuffle, typesize) = if config.shuffle {
            (BloscShuffleMode::Shuffle, Some(config.sample_type.size()))
        } else {
            (BloscShuffleMode::NoShuffle, None)
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| CodecError::Config(e.to_string()))?;
        Ok(Some(Arc::new(codec)))
    }

    fn attributes(grid: &GridBuffer, georef: &Georeference) -> serde_json::Map<String, serde_json::Value> {
        let extent = georef.extent();
        let mut attrs = serde_json::Map::new();
        attrs.insert(
            "extent".to_string(),
            serde_json::json!([extent.xmin, extent.xmax, extent.ymin, extent.ymax]),
        );
        attrs.insert("crs".to_string(), serde_json::json!(georef.crs()));
        attrs.insert("nodata".to_string(), serde_json::json!(grid.nodata()));
        attrs
    }

    fn georeference(
        attrs: &serde_json::Map<String, serde_json::Value>,
        rows: usize,
        cols: usize,
    ) -> Result<Georeference> {
        let extent = attrs
            .get("extent")
            .and_then(|v| v.as_array())
            .and_then(|arr| {
                if arr.len() == 4 {
                    Some(Extent::new(
                        arr[0].as_f64()?,
                        arr[1].as_f64()?,
                        arr[2].as_f64()?,
                        arr[3].as_f64()?,
                    ))
                } else {
                    None
                }
            })
            .ok_or_else(|| CodecError::unreadable("missing or malformed 'extent' attribute"))?;

        let crs = attrs
            .get("crs")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        if crs.is_none() {
            tracing::warn!("Zarr raster has no CRS attribute");
        }

        Ok(Georeference::new(extent, rows, cols, crs)?)
    }
}

impl RasterCodec for ZarrCodec {
    fn format(&self) -> RasterFormat {
        RasterFormat::Zarr
    }

    fn decode(&self, path: &Path) -> Result<(GridBuffer, Georeference)> {
        if !path.exists() {
            return Err(CodecError::file_not_found(path));
        }

        let store = FilesystemStore::new(path).map_err(|e| CodecError::unreadable(e.to_string()))?;
        let array = Array::open(Arc::new(store), "/")
            .map_err(|e| CodecError::unreadable(e.to_string()))?;

        let shape = array.shape().to_vec();
        let (bands, rows, cols) = match shape.as_slice() {
            [rows, cols] => (1, *rows as usize, *cols as usize),
            [bands, rows, cols] => (*bands as usize, *rows as usize, *cols as usize),
            _ => {
                return Err(CodecError::unreadable(format!(
                    "expected a 2-D or 3-D array, found shape {:?}",
                    shape
                )))
            }
        };

        let subset = ArraySubset::new_with_shape(shape.clone());
        let data: Vec<f64> = match array.data_type() {
            DataType::Float64 => array
                .retrieve_array_subset_elements::<f64>(&subset)
                .map_err(|e| CodecError::unreadable(e.to_string()))?,
            DataType::Float32 => array
                .retrieve_array_subset_elements::<f32>(&subset)
                .map_err(|e| CodecError::unreadable(e.to_string()))?
                .into_iter()
                .map(f64::from)
                .collect(),
            other => {
                return Err(CodecError::unreadable(format!(
                    "unsupported data type {:?}",
                    other
                )))
            }
        };

        let attrs = array.attributes();
        let nodata = attrs.get("nodata").and_then(|v| v.as_f64());
        let georef = Self::georeference(attrs, rows, cols)?;
        let grid = GridBuffer::from_vec(data, bands, rows, cols, nodata)?;

        tracing::debug!(
            path = %path.display(),
            bands,
            rows,
            cols,
            "Decoded Zarr raster"
        );

        Ok((grid, georef))
    }

    fn encode(&self, grid: &GridBuffer, georef: &Georeference, path: &Path) -> Result<()> {
        let (bands, rows, cols) = grid.dims();
        if rows != georef.rows() || cols != georef.cols() {
            return Err(raster_core::RasterError::dimension_mismatch(
                format!("{}x{} cells", georef.rows(), georef.cols()),
                format!("{}x{} cells", rows, cols),
            )
            .into());
        }

        std::fs::create_dir_all(path).map_err(|e| CodecError::write(e.to_string()))?;
        let store = FilesystemStore::new(path).map_err(|e| CodecError::write(e.to_string()))?;

        let chunk_size = self.config.chunk_size as u64;
        let band_chunk = self.config.band_chunk.min(bands) as u64;
        let shape = vec![bands as u64, rows as u64, cols as u64];

        let chunk_grid: zarrs::array::ChunkGrid = vec![band_chunk, chunk_size, chunk_size]
            .try_into()
            .map_err(|e| CodecError::Config(format!("{:?}", e)))?;

        let (data_type, fill_value) = match self.config.sample_type {
            SampleType::Float64 => (DataType::Float64, FillValue::from(grid.fill_value())),
            SampleType::Float32 => (DataType::Float32, FillValue::from(grid.fill_value() as f32)),
        };

        let mut binding = ArrayBuilder::new(shape.clone(), data_type, chunk_grid, fill_value);
        let mut builder = binding.attributes(Self::attributes(grid, georef));
        if let Some(codec) = self.blosc_codec()? {
            builder = builder.bytes_to_bytes_codecs(vec![codec]);
        }

        let array = builder
            .build(Arc::new(store), "/")
            .map_err(|e| CodecError::write(e.to_string()))?;

        array
            .store_metadata()
            .map_err(|e| CodecError::write(e.to_string()))?;

        let subset = ArraySubset::new_with_shape(shape);
        let stored = match self.config.sample_type {
            SampleType::Float64 => array.store_array_subset_elements::<f64>(&subset, grid.as_slice()),
            SampleType::Float32 => {
                let narrowed: Vec<f32> = grid.as_slice().iter().map(|v| *v as f32).collect();
                array.store_array_subset_elements::<f32>(&subset, &narrowed)
            }
        };
        stored.map_err(|e| CodecError::write(e.to_string()))?;

        tracing::debug!(
            path = %path.display(),
            bands,
            rows,
            cols,
            sample_type = self.config.sample_type.as_str(),
            compressor = %self.config.compressor,
            "Wrote Zarr raster"
        );

        Ok(())
    }
}
