/// Affine mapping between raster pixel indices and geographic coordinates.
use crate::error::{ConvertError, Result};

/// North-up affine transform without rotation.
///
/// `geo_x = origin_x + col * pixel_width`, `geo_y = origin_y - row * pixel_height`,
/// with both pixel sizes strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Result<Self> {
        if !(pixel_width > 0.0 && pixel_width.is_finite()) {
            return Err(ConvertError::InvalidGeoTransform(format!(
                "pixel width must be positive, got {pixel_width}"
            )));
        }
        if !(pixel_height > 0.0 && pixel_height.is_finite()) {
            return Err(ConvertError::InvalidGeoTransform(format!(
                "pixel height must be positive, got {pixel_height}"
            )));
        }
        if !(origin_x.is_finite() && origin_y.is_finite()) {
            return Err(ConvertError::InvalidGeoTransform(
                "origin must be finite".to_string(),
            ));
        }

        Ok(Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        })
    }

    /// Build from `[origin_x, pixel_width, rot0, origin_y, rot1, -pixel_height]`.
    /// Rotated rasters are rejected.
    pub fn from_gdal(gt: [f64; 6]) -> Result<Self> {
        if gt[2] != 0.0 || gt[4] != 0.0 {
            return Err(ConvertError::InvalidGeoTransform(format!(
                "rotation terms ({}, {}) are not supported",
                gt[2], gt[4]
            )));
        }
        Self::new(gt[0], gt[3], gt[1], -gt[5])
    }

    /// Pixel (col, row) to geographic (x, y).
    #[inline]
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y - row * self.pixel_height,
        )
    }

    /// Geographic (x, y) to fractional pixel (col, row).
    #[inline]
    pub fn geo_to_pixel(&self, geo_x: f64, geo_y: f64) -> (f64, f64) {
        (
            (geo_x - self.origin_x) / self.pixel_width,
            (self.origin_y - geo_y) / self.pixel_height,
        )
    }

    /// Geographic extent `(min_x, min_y, max_x, max_y)` of a `width x height` grid.
    pub fn extent(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let (max_x, min_y) = self.pixel_to_geo(width as f64, height as f64);
        (self.origin_x, min_y, max_x, self.origin_y)
    }
}
