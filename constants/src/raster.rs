/// Elevations below this are float32 nodata fill values
pub const ELEVATION_NODATA_THRESHOLD: f64 = -3e38;

/// Sentinel elevation emitted for missing cells of a colourised DEM
pub const ELEVATION_NODATA: f64 = -4e38;

/// Height rasters below this value are treated as missing and flattened to zero
pub const HEIGHT_NODATA_THRESHOLD: f64 = -34_020_000_000.0;

/// Elevation used when a location falls outside the height raster footprint
pub const OUT_OF_RANGE_ELEVATION: f64 = 0.0;

/// Number of discrete entries each palette is resampled to
pub const PALETTE_BINS: usize = 100;

/// Palette used when none is requested
pub const DEFAULT_PALETTE: &str = "inferno";

/// Default imagery bands (1-based) for red, green and blue
pub const DEFAULT_BANDS: [usize; 3] = [1, 2, 3];
