/// Degrees to radians factor applied once per point before encoding
pub const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// LV95 (CH1903+) reference origin, easting and northing in metres
pub const LV95_ORIGIN: (f64, f64) = (2_600_000.0, 1_200_000.0);

/// LV03 (CH1903) reference origin, easting and northing in metres
pub const LV03_ORIGIN: (f64, f64) = (600_000.0, 200_000.0);

/// Eastings at or above this value are LV95, below are LV03
pub const LV95_EASTING_THRESHOLD: f64 = 2_000_000.0;

/// Auxiliary values are expressed in units of 1000 km
pub const SWISS_AUX_SCALE: f64 = 1_000_000.0;

/// Polynomial results are in units of 10000" and become decimal degrees via `* 100 / 36`
pub const ARC_10000_SECONDS_TO_DEGREES: f64 = 100.0 / 36.0;

/// SITG (Geneva) local mesh offsets, applied as `(v - offset) * -1`
pub const SITG_OFFSET: (f64, f64) = (2_480_000.0, 1_109_000.0);
