/// Raster data model: row-major grids of samples with a geotransform.
use crate::error::{ConvertError, Result};
use crate::geotransform::GeoTransform;

/// Row-major grid of real samples, row = y, column = x.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self> {
        let expected = rows.checked_mul(cols);
        if expected != Some(values.len()) {
            return Err(ConvertError::InvalidRaster(format!(
                "grid of {}x{} does not match {} samples",
                rows,
                cols,
                values.len()
            )));
        }
        Ok(Self { rows, cols, values })
    }

    /// Build from nested rows; all rows must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(ConvertError::InvalidRaster(format!(
                "row {i} has {} samples, expected {cols}",
                row.len()
            )));
        }
        let values: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::new(rows.len(), cols, values)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Sample at `(row, col)`. Panics outside the grid.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(col < self.cols, "column {col} outside grid of {}", self.cols);
        self.values[row * self.cols + col]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// New grid with every sample passed through `f`.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Grid {
        Grid {
            rows: self.rows,
            cols: self.cols,
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }
}

/// Minimum and maximum of the valid samples of a band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStatistics {
    pub min: f64,
    pub max: f64,
    pub valid: usize,
}

impl BandStatistics {
    /// Feature scaling `(value - min) / (max - min)`; a flat band maps to 0.
    pub fn normalise(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range > 0.0 {
            (value - self.min) / range
        } else {
            0.0
        }
    }
}

/// One or more co-registered bands sharing a geotransform and nodata value.
#[derive(Debug, Clone)]
pub struct Raster {
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
    bands: Vec<Grid>,
}

impl Raster {
    pub fn new(transform: GeoTransform, nodata: Option<f64>, bands: Vec<Grid>) -> Result<Self> {
        let Some(first) = bands.first() else {
            return Err(ConvertError::BandOutOfRange {
                band: 1,
                available: 0,
            });
        };
        let (rows, cols) = (first.rows(), first.cols());
        if bands.iter().any(|b| b.rows() != rows || b.cols() != cols) {
            return Err(ConvertError::InvalidRaster(
                "bands differ in size".to_string(),
            ));
        }
        Ok(Self {
            transform,
            nodata,
            bands,
        })
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.bands[0].cols()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.bands[0].rows()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Band by 1-based index.
    pub fn band(&self, band: usize) -> Result<&Grid> {
        band.checked_sub(1)
            .and_then(|i| self.bands.get(i))
            .ok_or(ConvertError::BandOutOfRange {
                band,
                available: self.bands.len(),
            })
    }

    /// True when `value` equals the declared nodata (or is NaN).
    pub fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || self.nodata.is_some_and(|nd| value == nd)
    }

    /// Statistics of a band over the samples accepted by `is_valid`.
    pub fn statistics(&self, band: usize, is_valid: impl Fn(f64) -> bool) -> Result<Option<BandStatistics>> {
        let grid = self.band(band)?;
        let stats = grid
            .values()
            .iter()
            .copied()
            .filter(|&v| is_valid(v))
            .fold(None, |acc: Option<BandStatistics>, v| {
                Some(match acc {
                    None => BandStatistics {
                        min: v,
                        max: v,
                        valid: 1,
                    },
                    Some(s) => BandStatistics {
                        min: s.min.min(v),
                        max: s.max.max(v),
                        valid: s.valid + 1,
                    },
                })
            });
        Ok(stats)
    }
}
