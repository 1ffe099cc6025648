/// Named colour palettes for elevation colouring.
///
/// Each palette is a list of evenly spaced colour stops, linearly interpolated
/// and then resampled to a fixed number of discrete entries.
use crate::error::{ConvertError, Result};
use constants::raster::PALETTE_BINS;

const INFERNO: [u32; 10] = [
    0x000004, 0x1b0c41, 0x4a0c6b, 0x781c6d, 0xa52c60, 0xcf4446, 0xed6925, 0xfb9b06, 0xf7d13d,
    0xfcffa4,
];
const VIRIDIS: [u32; 10] = [
    0x440154, 0x482878, 0x3e4989, 0x31688e, 0x26828e, 0x1f9e89, 0x35b779, 0x6ece58, 0xb5de2b,
    0xfde725,
];
const MAGMA: [u32; 10] = [
    0x000004, 0x180f3d, 0x440f76, 0x721f81, 0x9e2f7f, 0xcd4071, 0xf1605d, 0xfd9668, 0xfeca8d,
    0xfcfdbf,
];
const PLASMA: [u32; 10] = [
    0x0d0887, 0x47039f, 0x7301a8, 0x9c179e, 0xbd3786, 0xd8576b, 0xed7953, 0xfa9e3b, 0xfdc926,
    0xf0f921,
];
const CIVIDIS: [u32; 10] = [
    0x00224e, 0x123570, 0x3b496c, 0x575d6d, 0x707173, 0x8a8678, 0xa59c74, 0xc3b369, 0xe1cc55,
    0xfee838,
];
const GRAY: [u32; 2] = [0x000000, 0xffffff];
const GREYS: [u32; 2] = [0xffffff, 0x000000];

/// Palette names accepted by [`Palette::by_name`].
pub const PALETTE_NAMES: &[&str] = &[
    "inferno", "viridis", "magma", "plasma", "cividis", "gray", "greys",
];

/// Discrete colour lookup table mapping [0, 1] to unit RGB.
#[derive(Debug, Clone)]
pub struct Palette {
    name: String,
    entries: Vec<[f64; 3]>,
}

impl Palette {
    /// Look up a palette by name, resampled to the default number of entries.
    pub fn by_name(name: &str) -> Result<Self> {
        Self::with_bins(name, PALETTE_BINS)
    }

    pub fn with_bins(name: &str, bins: usize) -> Result<Self> {
        let stops: &[u32] = match name.to_ascii_lowercase().as_str() {
            "inferno" => &INFERNO,
            "viridis" => &VIRIDIS,
            "magma" => &MAGMA,
            "plasma" => &PLASMA,
            "cividis" => &CIVIDIS,
            "gray" | "grey" => &GRAY,
            "greys" => &GREYS,
            _ => return Err(ConvertError::UnknownPalette(name.to_string())),
        };

        let stops: Vec<[f64; 3]> = stops.iter().map(|&hex| unpack(hex)).collect();
        let bins = bins.max(2);
        let entries = (0..bins)
            .map(|i| sample_stops(&stops, i as f64 / (bins - 1) as f64))
            .collect();

        Ok(Self {
            name: name.to_string(),
            entries,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Colour for `t`; values outside [0, 1] take the end colours.
    pub fn colour(&self, t: f64) -> [f64; 3] {
        let n = self.entries.len();
        let index = if t.is_nan() || t <= 0.0 {
            0
        } else {
            ((t * n as f64) as usize).min(n - 1)
        };
        self.entries[index]
    }
}

fn unpack(hex: u32) -> [f64; 3] {
    [
        ((hex >> 16) & 0xff) as f64 / 255.0,
        ((hex >> 8) & 0xff) as f64 / 255.0,
        (hex & 0xff) as f64 / 255.0,
    ]
}

/// Linear interpolation between evenly spaced stops.
fn sample_stops(stops: &[[f64; 3]], t: f64) -> [f64; 3] {
    let segments = (stops.len() - 1) as f64;
    let pos = t.clamp(0.0, 1.0) * segments;
    if pos >= segments {
        return stops[stops.len() - 1];
    }
    let i = (pos.floor() as usize).min(stops.len() - 2);
    let s = pos - i as f64;
    let (a, b) = (stops[i], stops[i + 1]);
    [
        a[0] + (b[0] - a[0]) * s,
        a[1] + (b[1] - a[1]) * s,
        a[2] + (b[2] - a[2]) * s,
    ]
}
