/// Elevation lookup for imagery pixels from a co-located height raster.
use crate::error::Result;
use crate::geotransform::GeoTransform;
use crate::raster::{Grid, Raster};
use crate::sampler::interpolate_or;
use constants::raster::{HEIGHT_NODATA_THRESHOLD, OUT_OF_RANGE_ELEVATION};
use log::debug;

/// Height raster resampled bilinearly at geographic positions.
pub struct ElevationModel {
    transform: GeoTransform,
    grid: Grid,
}

impl ElevationModel {
    /// Build from band 1 of a height raster. Missing cells (declared nodata,
    /// NaN, or float fill values) are flattened to zero once, here.
    pub fn from_raster(raster: &Raster) -> Result<Self> {
        let band = raster.band(1)?;
        let grid = band.map(|v| {
            if raster.is_nodata(v) || v < HEIGHT_NODATA_THRESHOLD {
                0.0
            } else {
                v
            }
        });

        debug!(
            "Elevation model {}x{} at origin ({}, {})",
            grid.cols(),
            grid.rows(),
            raster.transform.origin_x,
            raster.transform.origin_y
        );

        Ok(Self {
            transform: raster.transform,
            grid,
        })
    }

    pub fn width(&self) -> usize {
        self.grid.cols()
    }

    pub fn height(&self) -> usize {
        self.grid.rows()
    }

    /// Interpolated elevation, zero when the footprint leaves the raster.
    pub fn elevation_at(&self, geo_x: f64, geo_y: f64) -> f64 {
        let (col, row) = self.transform.geo_to_pixel(geo_x, geo_y);
        interpolate_or(row, col, &self.grid, OUT_OF_RANGE_ELEVATION)
    }
}
