//! Driver mode: the discrete motion regime each observer derives from speed.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverMode {
    Parked,
    City,
    Highway,
}

impl DriverMode {
    pub const ALL: [DriverMode; 3] = [DriverMode::Parked, DriverMode::City, DriverMode::Highway];

    pub fn as_str(&self) -> &'static str {
        match self {
            DriverMode::Parked => "parked",
            DriverMode::City => "city",
            DriverMode::Highway => "highway",
        }
    }
}

impl fmt::Display for DriverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speed bands, in km/h. Parked is `speed < parked_ceiling`, highway is
/// `speed > highway_floor`, city is everything between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeThresholds {
    pub parked_ceiling: f32,
    pub highway_floor: f32,
}

impl Default for ModeThresholds {
    fn default() -> Self {
        Self {
            parked_ceiling: 5.0,
            highway_floor: 80.0,
        }
    }
}

impl ModeThresholds {
    /// Lowest matching band wins. No hysteresis.
    pub fn mode_for(&self, speed: f32) -> DriverMode {
        if speed < self.parked_ceiling {
            DriverMode::Parked
        } else if speed > self.highway_floor {
            DriverMode::Highway
        } else {
            DriverMode::City
        }
    }
}
