/// Extent tracking over emitted record positions.
use crate::coordinates::RadianPoint;
use serde::{Deserialize, Serialize};

/// Axis-aligned extent of encoded positions (x, y in radians, z in metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl Default for OutputBounds {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBounds {
    /// Create empty bounds initialised to infinity values
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
            min_z: f64::INFINITY,
            max_z: f64::NEG_INFINITY,
        }
    }

    /// True until the first position is added.
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x
    }

    pub fn update(&mut self, p: &RadianPoint) {
        self.min_x = self.min_x.min(p.x);
        self.max_x = self.max_x.max(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_y = self.max_y.max(p.y);
        self.min_z = self.min_z.min(p.z);
        self.max_z = self.max_z.max(p.z);
    }

    /// Horizontal extent in degrees: `(min_lon, min_lat, max_lon, max_lat)`.
    pub fn degrees(&self) -> (f64, f64, f64, f64) {
        (
            self.min_x.to_degrees(),
            self.min_y.to_degrees(),
            self.max_x.to_degrees(),
            self.max_y.to_degrees(),
        )
    }
}
