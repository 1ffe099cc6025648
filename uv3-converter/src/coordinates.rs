/// Swiss grid to WGS84 conversion and the degree/radian boundary.
///
/// The forward model is swisstopo's approximate polynomial solution (accuracy
/// around one metre inside Switzerland). It is total: coordinates far outside
/// the Swiss territory still convert, only less accurately.
use constants::coordinate_system::{
    ARC_10000_SECONDS_TO_DEGREES, DEG_TO_RAD, LV03_ORIGIN, LV95_EASTING_THRESHOLD, LV95_ORIGIN,
    SITG_OFFSET, SWISS_AUX_SCALE,
};

/// Coordinate in a local projected datum (metres).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarPoint {
    pub easting: f64,
    pub northing: f64,
    pub height: f64,
}

impl PlanarPoint {
    pub fn new(easting: f64, northing: f64, height: f64) -> Self {
        Self {
            easting,
            northing,
            height,
        }
    }
}

/// Coordinate in WGS84, angles in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64, height: f64) -> Self {
        Self {
            latitude,
            longitude,
            height,
        }
    }

    /// Convert to the encoded representation (longitude, latitude in radians).
    pub fn to_radians(self) -> RadianPoint {
        RadianPoint::from_degrees(self.longitude, self.latitude, self.height)
    }
}

/// Encoded position: x = longitude (rad), y = latitude (rad), z = elevation (m).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadianPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl RadianPoint {
    pub fn from_degrees(longitude: f64, latitude: f64, elevation: f64) -> Self {
        Self {
            x: longitude * DEG_TO_RAD,
            y: latitude * DEG_TO_RAD,
            z: elevation,
        }
    }
}

/// Swiss reference frame of a planar coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwissFrame {
    /// CH1903 / LV03, origin (600000, 200000)
    Lv03,
    /// CH1903+ / LV95, origin (2600000, 1200000)
    Lv95,
}

impl SwissFrame {
    /// LV95 eastings carry a leading 2, LV03 eastings never reach 2000 km.
    pub fn detect(easting: f64) -> Self {
        if easting >= LV95_EASTING_THRESHOLD {
            SwissFrame::Lv95
        } else {
            SwissFrame::Lv03
        }
    }

    fn origin(self) -> (f64, f64) {
        match self {
            SwissFrame::Lv03 => LV03_ORIGIN,
            SwissFrame::Lv95 => LV95_ORIGIN,
        }
    }
}

/// Converts Swiss planar coordinates to WGS84 degrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatumConverter {
    /// Fixed frame, or `None` to detect it from each easting.
    frame: Option<SwissFrame>,
}

impl DatumConverter {
    pub fn new() -> Self {
        Self { frame: None }
    }

    pub fn with_frame(frame: SwissFrame) -> Self {
        Self { frame: Some(frame) }
    }

    fn aux(&self, easting: f64, northing: f64) -> (f64, f64) {
        let frame = self.frame.unwrap_or_else(|| SwissFrame::detect(easting));
        let (e0, n0) = frame.origin();
        (
            (easting - e0) / SWISS_AUX_SCALE,
            (northing - n0) / SWISS_AUX_SCALE,
        )
    }

    /// Convert `(easting, northing, height)` to `(latitude°, longitude°, height m)`.
    pub fn convert(&self, easting: f64, northing: f64, height: f64) -> GeoPoint {
        let (y_aux, x_aux) = self.aux(easting, northing);

        let lat = (16.9023892 + (3.238272 * x_aux))
            - (0.270978 * y_aux.powf(2.0))
            - (0.002528 * x_aux.powf(2.0))
            - (0.0447 * y_aux.powf(2.0) * x_aux)
            - (0.0140 * x_aux.powf(3.0));

        let lng = (2.6779094
            + (4.728982 * y_aux)
            + (0.791484 * y_aux * x_aux)
            + (0.1306 * y_aux * x_aux.powf(2.0)))
            - (0.0436 * y_aux.powf(3.0));

        let h = (height + 49.55) - (12.60 * y_aux) - (22.64 * x_aux);

        GeoPoint {
            latitude: lat * ARC_10000_SECONDS_TO_DEGREES,
            longitude: lng * ARC_10000_SECONDS_TO_DEGREES,
            height: h,
        }
    }

    /// Approximate WGS84 to Swiss grid conversion, in the converter's frame
    /// (LV95 when no frame is fixed).
    pub fn inverse(&self, latitude: f64, longitude: f64, height: f64) -> PlanarPoint {
        // Auxiliary values in units of 10000"
        let phi = (latitude * 3600.0 - 169_028.66) / 10_000.0;
        let lambda = (longitude * 3600.0 - 26_782.5) / 10_000.0;

        let easting = 2_600_072.37 + 211_455.93 * lambda
            - 10_938.51 * lambda * phi
            - 0.36 * lambda * phi.powi(2)
            - 44.54 * lambda.powi(3);

        let northing = 1_200_147.07
            + 308_807.95 * phi
            + 3_745.25 * lambda.powi(2)
            + 76.63 * phi.powi(2)
            - 194.56 * lambda.powi(2) * phi
            + 119.79 * phi.powi(3);

        let h = height - 49.55 + 2.73 * lambda + 6.94 * phi;

        match self.frame.unwrap_or(SwissFrame::Lv95) {
            SwissFrame::Lv95 => PlanarPoint::new(easting, northing, h),
            SwissFrame::Lv03 => PlanarPoint::new(
                easting - (LV95_ORIGIN.0 - LV03_ORIGIN.0),
                northing - (LV95_ORIGIN.1 - LV03_ORIGIN.1),
                h,
            ),
        }
    }
}

/// SITG local mesh scaling: `(x - 2480000) * -1`, `(y - 1109000) * -1`.
pub fn sitg_scaling(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    ((x - SITG_OFFSET.0) * -1.0, (y - SITG_OFFSET.1) * -1.0, z)
}
