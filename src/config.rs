//! Runtime configuration, loaded from TOML.
//!
//! Every section falls back to defaults, so an empty file (or no file) gives
//! the stock car, the stock mode bands and the stock dashboard.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::layout::{LayoutConfig, LayoutPolicy};
use crate::mode::ModeThresholds;
use crate::vehicle::{TICK_HZ_RANGE, VehicleConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Snapshots an observer may trail by before the oldest are dropped.
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3001".to_string(),
            broadcast_capacity: 16,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub server: ServerConfig,
    pub vehicle: VehicleConfig,
    pub modes: ModeThresholds,
    pub layout: LayoutConfig,
}

impl DashConfig {
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: DashConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            detail: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.vehicle;

        if !TICK_HZ_RANGE.contains(&v.tick_hz) {
            return Err(invalid(
                "vehicle.tick_hz",
                format!(
                    "must be in [{}, {}], got {}",
                    TICK_HZ_RANGE.start(),
                    TICK_HZ_RANGE.end(),
                    v.tick_hz
                ),
            ));
        }
        positive("vehicle.accel_rate", v.accel_rate)?;
        positive("vehicle.friction_rate", v.friction_rate)?;
        positive("vehicle.max_speed", v.max_speed)?;
        positive("vehicle.reverse_accel_rate", v.reverse_accel_rate)?;
        positive("vehicle.gear_window", v.gear_window)?;

        if !(v.brake_rate > v.friction_rate) {
            return Err(invalid(
                "vehicle.brake_rate",
                format!("must exceed friction_rate ({} <= {})", v.brake_rate, v.friction_rate),
            ));
        }
        if !(v.reverse_max > 0.0 && v.reverse_max <= v.max_speed) {
            return Err(invalid(
                "vehicle.reverse_max",
                format!("must be in (0, max_speed], got {}", v.reverse_max),
            ));
        }
        if !(v.idle_rpm >= 0.0 && v.idle_rpm < v.redline_rpm) {
            return Err(invalid(
                "vehicle.idle_rpm",
                format!("must be below redline_rpm ({} >= {})", v.idle_rpm, v.redline_rpm),
            ));
        }
        if !(v.idle_jitter >= 0.0) {
            return Err(invalid("vehicle.idle_jitter", format!("must be >= 0, got {}", v.idle_jitter)));
        }
        if !(0.0..=100.0).contains(&v.initial_fuel) {
            return Err(invalid(
                "vehicle.initial_fuel",
                format!("must be a percentage, got {}", v.initial_fuel),
            ));
        }

        let m = &self.modes;
        if !(m.parked_ceiling >= 0.0 && m.parked_ceiling <= m.highway_floor) {
            return Err(invalid(
                "modes.parked_ceiling",
                format!(
                    "must be in [0, highway_floor], got {} (highway_floor {})",
                    m.parked_ceiling, m.highway_floor
                ),
            ));
        }

        if self.server.broadcast_capacity == 0 {
            return Err(invalid("server.broadcast_capacity", "must be at least 1".to_string()));
        }

        LayoutPolicy::from_config(&self.layout)?;
        Ok(())
    }

    pub fn layout_policy(&self) -> Result<LayoutPolicy, ConfigError> {
        LayoutPolicy::from_config(&self.layout)
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    // also rejects NaN
    if value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be > 0, got {value}")))
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
