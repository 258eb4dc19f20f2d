//! Fixed-size patch extraction and reconstruction.
//!
//! Patches are flattened band-major, then row-major within the patch, and
//! anchored at their top-left cell. Reconstruction averages overlapping
//! contributions instead of letting later patches overwrite earlier ones.

use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};
use crate::georef::Georeference;
use crate::grid::{is_missing, GridBuffer};
use crate::image::RasterImage;

/// Patch size and the step between consecutive anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchShape {
    pub rows: usize,
    pub cols: usize,
    pub row_stride: usize,
    pub col_stride: usize,
}

impl PatchShape {
    /// Patches of `rows x cols` cells stepping `stride` cells in both directions.
    pub fn new(rows: usize, cols: usize, stride: usize) -> Self {
        Self {
            rows,
            cols,
            row_stride: stride,
            col_stride: stride,
        }
    }

    /// Non-overlapping tiling: stride equals the patch size.
    pub fn tiles(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_stride: rows,
            col_stride: cols,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(RasterError::InvalidPatch(format!(
                "patch size {}x{} must be positive",
                self.rows, self.cols
            )));
        }
        if self.row_stride == 0 || self.col_stride == 0 {
            return Err(RasterError::InvalidPatch(format!(
                "stride {}x{} must be positive",
                self.row_stride, self.col_stride
            )));
        }
        Ok(())
    }
}

/// One flattened patch and the grid cell of its top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub anchor: (usize, usize),
    pub values: Vec<f64>,
}

/// Lazily evaluated patches of an image.
///
/// Iterating never copies more than one patch at a time, and the sequence
/// can be walked any number of times.
#[derive(Debug, Clone, Copy)]
pub struct Patches<'a> {
    image: &'a RasterImage,
    shape: PatchShape,
    anchor_rows: usize,
    anchor_cols: usize,
}

impl<'a> Patches<'a> {
    pub fn shape(&self) -> PatchShape {
        self.shape
    }

    /// Number of patches in the sequence.
    pub fn len(&self) -> usize {
        self.anchor_rows * self.anchor_cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Anchors in scan order.
    pub fn anchors(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.len()).map(move |i| self.anchor(i))
    }

    /// Start a fresh pass over the patches.
    pub fn iter(&self) -> PatchIter<'a> {
        PatchIter {
            patches: *self,
            next: 0,
        }
    }

    fn anchor(&self, index: usize) -> (usize, usize) {
        let row = index / self.anchor_cols;
        let col = index % self.anchor_cols;
        (row * self.shape.row_stride, col * self.shape.col_stride)
    }

    fn patch(&self, index: usize) -> Patch {
        let (row0, col0) = self.anchor(index);
        let grid = self.image.grid();
        let cols = grid.cols();
        let mut values = Vec::with_capacity(grid.bands() * self.shape.rows * self.shape.cols);

        for band in grid.as_slice().chunks(grid.band_len()) {
            for row in row0..row0 + self.shape.rows {
                let start = row * cols + col0;
                values.extend_from_slice(&band[start..start + self.shape.cols]);
            }
        }

        Patch {
            anchor: (row0, col0),
            values,
        }
    }
}

impl<'a> IntoIterator for &Patches<'a> {
    type Item = Patch;
    type IntoIter = PatchIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over [`Patches`].
#[derive(Debug, Clone)]
pub struct PatchIter<'a> {
    patches: Patches<'a>,
    next: usize,
}

impl Iterator for PatchIter<'_> {
    type Item = Patch;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.patches.len() {
            return None;
        }
        let patch = self.patches.patch(self.next);
        self.next += 1;
        Some(patch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.patches.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PatchIter<'_> {}

impl RasterImage {
    /// Patches anchored at every position where a whole patch fits.
    ///
    /// Anchors run in row-major order, `row_stride`/`col_stride` cells apart.
    /// A patch larger than the image yields an empty sequence.
    pub fn to_patches(&self, shape: PatchShape) -> Result<Patches<'_>> {
        shape.validate()?;

        let anchor_count = |len: usize, size: usize, stride: usize| {
            if size > len {
                0
            } else {
                (len - size) / stride + 1
            }
        };

        let patches = Patches {
            image: self,
            shape,
            anchor_rows: anchor_count(self.rows(), shape.rows, shape.row_stride),
            anchor_cols: anchor_count(self.cols(), shape.cols, shape.col_stride),
        };

        tracing::debug!(
            patch_rows = shape.rows,
            patch_cols = shape.cols,
            count = patches.len(),
            "Flattening raster into patches"
        );

        Ok(patches)
    }

    /// Rebuild an image on `georef` from patches.
    ///
    /// Overlapping contributions to a cell are averaged; no-data
    /// contributions are ignored. Cells no patch covers are no-data.
    pub fn from_patches<I>(
        patches: I,
        shape: PatchShape,
        georef: Georeference,
        bands: usize,
        nodata: Option<f64>,
    ) -> Result<RasterImage>
    where
        I: IntoIterator<Item = Patch>,
    {
        let grid = reconstruct(patches, shape, (bands, georef.rows(), georef.cols()), nodata)?;
        RasterImage::new(grid, georef)
    }
}

/// Write patches back onto a `(bands, rows, cols)` grid, averaging overlaps.
pub fn reconstruct<I>(
    patches: I,
    shape: PatchShape,
    (bands, rows, cols): (usize, usize, usize),
    nodata: Option<f64>,
) -> Result<GridBuffer>
where
    I: IntoIterator<Item = Patch>,
{
    shape.validate()?;
    let mut grid = GridBuffer::empty(bands, rows, cols, nodata)?;

    let band_len = rows * cols;
    let patch_band_len = shape.rows * shape.cols;
    let mut sums = vec![0.0f64; bands * band_len];
    let mut counts = vec![0u32; bands * band_len];

    for patch in patches {
        let (row0, col0) = patch.anchor;
        if patch.values.len() != bands * patch_band_len {
            return Err(RasterError::dimension_mismatch(
                format!("{} values per patch", bands * patch_band_len),
                format!("{} values at anchor {:?}", patch.values.len(), patch.anchor),
            ));
        }
        if row0 + shape.rows > rows || col0 + shape.cols > cols {
            return Err(RasterError::out_of_bounds(
                (0, row0 + shape.rows - 1, col0 + shape.cols - 1),
                (bands, rows, cols),
            ));
        }

        for (band, values) in patch.values.chunks(patch_band_len).enumerate() {
            for (i, value) in values.iter().enumerate() {
                if is_missing(*value, nodata) {
                    continue;
                }
                let row = row0 + i / shape.cols;
                let col = col0 + i % shape.cols;
                let idx = band * band_len + row * cols + col;
                sums[idx] += value;
                counts[idx] += 1;
            }
        }
    }

    let mut uncovered = 0usize;
    for band in 0..bands {
        let out = grid.band_mut(band)?;
        let base = band * band_len;
        for (i, cell) in out.iter_mut().enumerate() {
            match counts[base + i] {
                0 => uncovered += 1,
                1 => *cell = sums[base + i],
                n => *cell = sums[base + i] / n as f64,
            }
        }
    }

    if uncovered > 0 {
        tracing::warn!(uncovered, "Patches left cells without data");
    }

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::georef::Extent;

    fn sequence_image(bands: usize, rows: usize, cols: usize) -> RasterImage {
        let data = (0..bands)
            .map(|b| {
                (0..rows * cols)
                    .map(|i| (b * 1000 + i) as f64)
                    .collect::<Vec<_>>()
            })
            .collect();
        RasterImage::from_bands(
            data,
            rows,
            cols,
            Extent::new(0.0, cols as f64, 0.0, rows as f64),
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_anchor_scan_order() {
        let image = sequence_image(1, 5, 6);
        let patches = image.to_patches(PatchShape::new(2, 3, 2)).unwrap();
        let anchors: Vec<_> = patches.anchors().collect();
        assert_eq!(anchors, vec![(0, 0), (0, 2), (2, 0), (2, 2)]);
        assert_eq!(patches.len(), 4);
    }

    #[test]
    fn test_patch_layout_band_major() {
        let image = sequence_image(2, 4, 4);
        let patches = image.to_patches(PatchShape::tiles(2, 2)).unwrap();
        let second = patches.iter().nth(1).unwrap();
        assert_eq!(second.anchor, (0, 2));
        assert_eq!(second.values, vec![2.0, 3.0, 6.0, 7.0, 1002.0, 1003.0, 1006.0, 1007.0]);
    }

    #[test]
    fn test_sequence_is_restartable() {
        let image = sequence_image(1, 4, 4);
        let patches = image.to_patches(PatchShape::new(2, 2, 1)).unwrap();
        let first: Vec<_> = patches.iter().collect();
        let second: Vec<_> = (&patches).into_iter().collect();
        assert_eq!(first.len(), 9);
        assert_eq!(first, second);
    }

    #[test]
    fn test_oversized_patch_is_empty() {
        let image = sequence_image(1, 3, 3);
        let patches = image.to_patches(PatchShape::tiles(4, 4)).unwrap();
        assert!(patches.is_empty());
        assert_eq!(patches.iter().count(), 0);
    }

    #[test]
    fn test_invalid_shape() {
        let image = sequence_image(1, 3, 3);
        assert!(matches!(
            image.to_patches(PatchShape::new(2, 2, 0)),
            Err(RasterError::InvalidPatch(_))
        ));
        assert!(image.to_patches(PatchShape::tiles(0, 2)).is_err());
    }

    #[test]
    fn test_tiles_roundtrip_exact() {
        let image = sequence_image(3, 6, 8);
        let shape = PatchShape::tiles(3, 4);
        let patches = image.to_patches(shape).unwrap();
        let rebuilt = RasterImage::from_patches(
            patches.iter(),
            shape,
            image.georef().clone(),
            image.bands(),
            None,
        )
        .unwrap();
        assert_eq!(rebuilt, image);
    }

    #[test]
    fn test_overlap_is_averaged() {
        let shape = PatchShape::new(1, 2, 1);
        let patches = vec![
            Patch {
                anchor: (0, 0),
                values: vec![1.0, 2.0],
            },
            Patch {
                anchor: (0, 1),
                values: vec![4.0, 6.0],
            },
        ];
        let grid = reconstruct(patches, shape, (1, 1, 3), None).unwrap();
        assert_eq!(grid.as_slice(), &[1.0, 3.0, 6.0]);
    }

    #[test]
    fn test_uncovered_cells_are_nodata() {
        let shape = PatchShape::tiles(1, 1);
        let patches = vec![Patch {
            anchor: (0, 0),
            values: vec![5.0],
        }];
        let grid = reconstruct(patches, shape, (1, 1, 2), Some(-1.0)).unwrap();
        assert_eq!(grid.as_slice(), &[5.0, -1.0]);
    }

    #[test]
    fn test_reconstruct_rejects_bad_patches() {
        let shape = PatchShape::tiles(2, 2);
        let short = vec![Patch {
            anchor: (0, 0),
            values: vec![1.0; 3],
        }];
        assert!(matches!(
            reconstruct(short, shape, (1, 2, 2), None),
            Err(RasterError::DimensionMismatch { .. })
        ));

        let outside = vec![Patch {
            anchor: (1, 1),
            values: vec![1.0; 4],
        }];
        assert!(matches!(
            reconstruct(outside, shape, (1, 2, 2), None),
            Err(RasterError::OutOfBounds { .. })
        ));
    }
}
