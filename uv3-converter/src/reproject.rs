/// Reprojection of Swiss-grid rasters onto a WGS84 degree grid.
///
/// The raster pipelines treat geotransform coordinates as WGS84 degrees. A
/// raster declared in LV03 or LV95 is warped once before processing: the
/// output keeps the source pixel dimensions over the reprojected extent and is
/// filled by nearest-neighbour lookup through the inverse datum model.
use crate::coordinates::{DatumConverter, SwissFrame};
use crate::error::{ConvertError, Result};
use crate::geotransform::GeoTransform;
use crate::raster::{Grid, Raster};
use log::info;
use std::fmt;
use std::str::FromStr;

/// Edge samples per side used to bound the reprojected extent.
const EXTENT_EDGE_SAMPLES: usize = 16;

/// Declared coordinate reference system of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crs {
    #[default]
    Wgs84,
    Lv03,
    Lv95,
}

impl Crs {
    fn swiss_frame(self) -> Option<SwissFrame> {
        match self {
            Crs::Wgs84 => None,
            Crs::Lv03 => Some(SwissFrame::Lv03),
            Crs::Lv95 => Some(SwissFrame::Lv95),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Crs::Wgs84 => "wgs84",
            Crs::Lv03 => "lv03",
            Crs::Lv95 => "lv95",
        })
    }
}

impl FromStr for Crs {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wgs84" | "epsg:4326" => Ok(Crs::Wgs84),
            "lv03" | "ch1903" | "epsg:21781" => Ok(Crs::Lv03),
            "lv95" | "ch1903+" | "epsg:2056" => Ok(Crs::Lv95),
            _ => Err(ConvertError::UnknownCrs(s.to_string())),
        }
    }
}

/// Return `raster` expressed on a WGS84 grid, warping only when `crs` differs.
pub fn to_wgs84(raster: Raster, crs: Crs) -> Result<Raster> {
    let Some(frame) = crs.swiss_frame() else {
        return Ok(raster);
    };

    let converter = DatumConverter::with_frame(frame);
    let (width, height) = (raster.width(), raster.height());
    let (min_lon, min_lat, max_lon, max_lat) = reprojected_extent(&raster, &converter);

    let transform = GeoTransform::new(
        min_lon,
        max_lat,
        (max_lon - min_lon) / width as f64,
        (max_lat - min_lat) / height as f64,
    )?;

    info!(
        "Reprojecting {}x{} raster from {} to WGS84: lon {:.6}..{:.6}, lat {:.6}..{:.6}",
        width, height, crs, min_lon, max_lon, min_lat, max_lat
    );

    // Source cell of every output cell, resolved once and shared by all bands.
    let mut lookup = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let (lon, lat) = transform.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5);
            let planar = converter.inverse(lat, lon, 0.0);
            let (src_col, src_row) = raster
                .transform
                .geo_to_pixel(planar.easting, planar.northing);
            let inside = src_col >= 0.0
                && src_row >= 0.0
                && src_col < width as f64
                && src_row < height as f64;
            lookup.push(inside.then(|| (src_row as usize, src_col as usize)));
        }
    }

    let fill = raster.nodata.unwrap_or(f64::NAN);
    let mut bands = Vec::with_capacity(raster.band_count());
    for band in 1..=raster.band_count() {
        let source = raster.band(band)?;
        let values = lookup
            .iter()
            .map(|cell| cell.map_or(fill, |(r, c)| source.get(r, c)))
            .collect();
        bands.push(Grid::new(height, width, values)?);
    }

    Raster::new(transform, raster.nodata, bands)
}

/// WGS84 bounding box `(min_lon, min_lat, max_lon, max_lat)` of the raster
/// outline, sampled along each edge.
fn reprojected_extent(raster: &Raster, converter: &DatumConverter) -> (f64, f64, f64, f64) {
    let (width, height) = (raster.width() as f64, raster.height() as f64);
    let mut bounds = (
        f64::INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::NEG_INFINITY,
    );

    for i in 0..=EXTENT_EDGE_SAMPLES {
        let t = i as f64 / EXTENT_EDGE_SAMPLES as f64;
        let outline = [
            (t * width, 0.0),
            (t * width, height),
            (0.0, t * height),
            (width, t * height),
        ];
        for (col, row) in outline {
            let (e, n) = raster.transform.pixel_to_geo(col, row);
            let geo = converter.convert(e, n, 0.0);
            bounds.0 = bounds.0.min(geo.longitude);
            bounds.1 = bounds.1.min(geo.latitude);
            bounds.2 = bounds.2.max(geo.longitude);
            bounds.3 = bounds.3.max(geo.latitude);
        }
    }

    bounds
}
