//! ESRI ASCII grid codec.
//!
//! ```text
//! ncols         4
//! nrows         3
//! xllcorner     0.0
//! yllcorner     0.0
//! cellsize      1.0
//! NODATA_value  -9999
//! 1 2 3 4
//! ...
//! ```
//!
//! The format holds a single band. `xllcenter`/`yllcenter` and separate
//! `dx`/`dy` cell sizes are accepted on read.

use std::fmt::Write as _;
use std::path::Path;

use raster_core::{cell_count, Georeference, GridBuffer};

use crate::error::{CodecError, Result};
use crate::format::{RasterCodec, RasterFormat};

/// Reads and writes single-band ESRI ASCII grids.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiGridCodec;

#[derive(Debug, Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<f64>,
    yll: Option<f64>,
    center: bool,
    cellsize: Option<f64>,
    dx: Option<f64>,
    dy: Option<f64>,
    nodata: Option<f64>,
}

impl Header {
    /// Consume one `key value` line. Returns false when the line is not a header line.
    fn accept(&mut self, line: &str) -> Result<bool> {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            return Ok(false);
        };
        let key = key.to_lowercase();

        let number = || {
            value
                .parse::<f64>()
                .map_err(|_| CodecError::unreadable(format!("invalid value '{}' for {}", value, key)))
        };
        let count = || {
            value
                .parse::<usize>()
                .map_err(|_| CodecError::unreadable(format!("invalid value '{}' for {}", value, key)))
        };

        match key.as_str() {
            "ncols" => self.ncols = Some(count()?),
            "nrows" => self.nrows = Some(count()?),
            "xllcorner" => self.xll = Some(number()?),
            "yllcorner" => self.yll = Some(number()?),
            "xllcenter" => {
                self.xll = Some(number()?);
                self.center = true;
            }
            "yllcenter" => {
                self.yll = Some(number()?);
                self.center = true;
            }
            "cellsize" => self.cellsize = Some(number()?),
            "dx" => self.dx = Some(number()?),
            "dy" => self.dy = Some(number()?),
            "nodata_value" => self.nodata = Some(number()?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn georeference(&self) -> Result<Georeference> {
        let missing = |name: &str| CodecError::unreadable(format!("missing header '{}'", name));

        let cols = self.ncols.ok_or_else(|| missing("ncols"))?;
        let rows = self.nrows.ok_or_else(|| missing("nrows"))?;
        let xll = self.xll.ok_or_else(|| missing("xllcorner"))?;
        let yll = self.yll.ok_or_else(|| missing("yllcorner"))?;
        let (xres, yres) = match (self.cellsize, self.dx, self.dy) {
            (Some(size), _, _) => (size, size),
            (None, Some(dx), Some(dy)) => (dx, dy),
            _ => return Err(missing("cellsize")),
        };

        let (xmin, ymin) = if self.center {
            (xll - xres / 2.0, yll - yres / 2.0)
        } else {
            (xll, yll)
        };

        Ok(Georeference::from_resolution(
            xmin,
            ymin + rows as f64 * yres,
            xres,
            yres,
            rows,
            cols,
            None,
        )?)
    }
}

impl AsciiGridCodec {
    /// Parse an ASCII grid from text.
    pub fn parse(text: &str) -> Result<(GridBuffer, Georeference)> {
        let mut header = Header::default();
        let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();

        while let Some(line) = lines.peek() {
            if !header.accept(line)? {
                break;
            }
            lines.next();
        }

        let georef = header.georeference()?;
        let (rows, cols) = (georef.rows(), georef.cols());
        let cells = cell_count(1, rows, cols).map_err(|_| {
            CodecError::unreadable(format!("grid of {}x{} cells is too large", rows, cols))
        })?;

        let mut data = Vec::new();
        for line in lines {
            for token in line.split_whitespace() {
                let value = token
                    .parse::<f64>()
                    .map_err(|_| CodecError::unreadable(format!("invalid cell value '{}'", token)))?;
                if data.len() == cells {
                    return Err(CodecError::unreadable(format!(
                        "more than {} cell values",
                        cells
                    )));
                }
                data.push(value);
            }
        }

        if data.len() != cells {
            return Err(CodecError::unreadable(format!(
                "expected {} cell values, found {}",
                cells,
                data.len()
            )));
        }

        let grid = GridBuffer::from_vec(data, 1, rows, cols, header.nodata)?;
        Ok((grid, georef))
    }

    /// Render a single-band grid as ASCII grid text.
    pub fn render(grid: &GridBuffer, georef: &Georeference) -> Result<String> {
        if grid.bands() != 1 {
            return Err(CodecError::unsupported(format!(
                "ASCII grids hold one band, raster has {}",
                grid.bands()
            )));
        }
        if grid.rows() != georef.rows() || grid.cols() != georef.cols() {
            return Err(raster_core::RasterError::dimension_mismatch(
                format!("{}x{} cells", georef.rows(), georef.cols()),
                format!("{}x{} cells", grid.rows(), grid.cols()),
            )
            .into());
        }

        let extent = georef.extent();
        let (xres, yres) = georef.resolution();
        let fill = grid.fill_value();

        let mut out = String::new();
        let fmt_err = |e: std::fmt::Error| CodecError::write(e.to_string());
        writeln!(out, "ncols {}", grid.cols()).map_err(fmt_err)?;
        writeln!(out, "nrows {}", grid.rows()).map_err(fmt_err)?;
        writeln!(out, "xllcorner {}", extent.xmin).map_err(fmt_err)?;
        writeln!(out, "yllcorner {}", extent.ymin).map_err(fmt_err)?;
        if xres == yres {
            writeln!(out, "cellsize {}", xres).map_err(fmt_err)?;
        } else {
            writeln!(out, "dx {}", xres).map_err(fmt_err)?;
            writeln!(out, "dy {}", yres).map_err(fmt_err)?;
        }
        if let Some(nodata) = grid.nodata() {
            writeln!(out, "NODATA_value {}", nodata).map_err(fmt_err)?;
        }

        for row in grid.as_slice().chunks(grid.cols()) {
            let line = row
                .iter()
                .map(|v| if v.is_nan() { fill } else { *v })
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(out, "{}", line).map_err(fmt_err)?;
        }

        Ok(out)
    }
}

impl RasterCodec for AsciiGridCodec {
    fn format(&self) -> RasterFormat {
        RasterFormat::AsciiGrid
    }

    fn decode(&self, path: &Path) -> Result<(GridBuffer, Georeference)> {
        if !path.exists() {
            return Err(CodecError::file_not_found(path));
        }
        let text = std::fs::read_to_string(path)?;
        let decoded = Self::parse(&text)?;

        tracing::debug!(
            path = %path.display(),
            rows = decoded.1.rows(),
            cols = decoded.1.cols(),
            "Decoded ASCII grid"
        );

        Ok(decoded)
    }

    fn encode(&self, grid: &GridBuffer, georef: &Georeference, path: &Path) -> Result<()> {
        if georef.crs().is_some() {
            tracing::warn!(crs = ?georef.crs(), "ASCII grids do not store a CRS; dropping it");
        }
        let text = Self::render(grid, georef)?;
        std::fs::write(path, text).map_err(|e| CodecError::write(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_core::Extent;

    const SAMPLE: &str = "\
ncols 4
nrows 3
xllcorner 10.0
yllcorner 20.0
cellsize 0.5
NODATA_value -9999
1 2 3 4
5 -9999 7 8
9 10 11 12
";

    #[test]
    fn test_parse_sample() {
        let (grid, georef) = AsciiGridCodec::parse(SAMPLE).unwrap();
        assert_eq!(grid.dims(), (1, 3, 4));
        assert_eq!(grid.nodata(), Some(-9999.0));
        assert_eq!(grid.get(0, 0, 0).unwrap(), Some(1.0));
        assert_eq!(grid.get(0, 1, 1).unwrap(), None);
        assert_eq!(grid.get(0, 2, 3).unwrap(), Some(12.0));
        assert_eq!(georef.extent(), &Extent::new(10.0, 12.0, 20.0, 21.5));
    }

    #[test]
    fn test_parse_center_and_dx_dy() {
        let text = "ncols 2\nnrows 2\nxllcenter 0.5\nyllcenter 1\ndx 1\ndy 2\n1 2\n3 4\n";
        let (grid, georef) = AsciiGridCodec::parse(text).unwrap();
        assert_eq!(grid.nodata(), None);
        assert_eq!(georef.extent(), &Extent::new(0.0, 2.0, 0.0, 4.0));
        assert_eq!(georef.resolution(), (1.0, 2.0));
    }

    #[test]
    fn test_parse_errors() {
        let short = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n";
        assert!(matches!(
            AsciiGridCodec::parse(short),
            Err(CodecError::UnreadableFormat(_))
        ));

        let no_size = "ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\n1\n";
        assert!(matches!(
            AsciiGridCodec::parse(no_size),
            Err(CodecError::UnreadableFormat(_))
        ));

        let bad_value = "ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\nabc\n";
        assert!(AsciiGridCodec::parse(bad_value).is_err());

        let long = "ncols 2\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n";
        assert!(matches!(
            AsciiGridCodec::parse(long),
            Err(CodecError::UnreadableFormat(_))
        ));
    }

    #[test]
    fn test_parse_rejects_overflowing_dimensions() {
        let huge = 1usize << (usize::BITS / 2);
        let text = format!(
            "ncols {}\nnrows {}\nxllcorner 0\nyllcorner 0\ncellsize 1\n",
            huge, huge
        );
        assert!(matches!(
            AsciiGridCodec::parse(&text),
            Err(CodecError::UnreadableFormat(_))
        ));
    }

    #[test]
    fn test_render_roundtrip() {
        let (grid, georef) = AsciiGridCodec::parse(SAMPLE).unwrap();
        let text = AsciiGridCodec::render(&grid, &georef).unwrap();
        let (again, again_georef) = AsciiGridCodec::parse(&text).unwrap();
        assert_eq!(again, grid);
        assert_eq!(again_georef, georef);
    }

    #[test]
    fn test_render_rejects_multiband() {
        let grid = GridBuffer::new(2, 2, 2, 0.0, None).unwrap();
        let georef = Georeference::new(Extent::new(0.0, 2.0, 0.0, 2.0), 2, 2, None).unwrap();
        assert!(matches!(
            AsciiGridCodec::render(&grid, &georef),
            Err(CodecError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_render_writes_sentinel_for_nan() {
        let grid = GridBuffer::from_vec(vec![f64::NAN, 2.0], 1, 1, 2, Some(-1.0)).unwrap();
        let georef = Georeference::new(Extent::new(0.0, 2.0, 0.0, 1.0), 1, 2, None).unwrap();
        let text = AsciiGridCodec::render(&grid, &georef).unwrap();
        assert!(text.ends_with("-1 2\n"));
    }
}
