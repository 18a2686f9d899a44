use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

// ---------------------------------------------
// GEAR
// ---------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gear {
    #[default]
    #[serde(rename = "P")]
    Park,
    #[serde(rename = "R")]
    Reverse,
    #[serde(rename = "D")]
    Drive,
}

impl Gear {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gear::Park => "P",
            Gear::Reverse => "R",
            Gear::Drive => "D",
        }
    }
}

impl fmt::Display for Gear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------
// VEHICLE STATE (owned by the simulation tick)
// ---------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub speed: f32,        // km/h, 0..=max_speed
    pub engine_speed: f32, // rpm, idle_rpm..=redline_rpm
    pub gear: Gear,
    pub temperature: f32,  // °C, carried through unchanged
    pub fuel: f32,         // percent, 0..=100
}

impl VehicleState {
    /// Standstill in park, engine idling.
    pub fn at_rest(config: &VehicleConfig) -> Self {
        Self {
            speed: 0.0,
            engine_speed: config.idle_rpm,
            gear: Gear::Park,
            temperature: config.initial_temp,
            fuel: config.initial_fuel.clamp(0.0, 100.0),
        }
    }
}

// ---------------------------------------------
// VEHICLE TUNING
// ---------------------------------------------
/// Per-tick rates and engine-speed model constants.
///
/// All rates are applied once per tick, so changing `tick_hz` changes the
/// wall-clock feel of the car as well as the update rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub tick_hz: f32,            // ticks per second

    // --- Drive ---
    pub accel_rate: f32,         // km/h gained per tick on throttle
    pub brake_rate: f32,         // km/h lost per tick on brake
    pub friction_rate: f32,      // km/h lost per tick coasting
    pub max_speed: f32,          // km/h

    // --- Reverse ---
    pub reverse_accel_rate: f32, // km/h per tick, both directions
    pub reverse_max: f32,        // km/h

    // --- Engine speed ---
    pub idle_rpm: f32,           // idle floor
    pub idle_jitter: f32,        // rpm wobble above the floor at standstill
    pub park_rev_rpm: f32,       // throttle with no load
    pub gear_window: f32,        // km/h per notional gear
    pub rpm_per_speed: f32,      // rpm per km/h inside a gear window
    pub rpm_base: f32,           // rpm at the bottom of a gear window
    pub load_rpm: f32,           // extra rpm while on throttle
    pub redline_rpm: f32,        // ceiling

    // --- Carried values ---
    pub initial_temp: f32,       // °C
    pub initial_fuel: f32,       // percent
}

pub const HATCHBACK: VehicleConfig = VehicleConfig {
    tick_hz: 60.0,

    accel_rate: 0.8,
    brake_rate: 2.5,             // ~12x coasting decel
    friction_rate: 0.2,
    max_speed: 240.0,

    reverse_accel_rate: 0.5,
    reverse_max: 40.0,

    idle_rpm: 800.0,
    idle_jitter: 20.0,
    park_rev_rpm: 3000.0,
    gear_window: 60.0,
    rpm_per_speed: 100.0,
    rpm_base: 1000.0,
    load_rpm: 500.0,
    redline_rpm: 7000.0,

    initial_temp: 90.0,
    initial_fuel: 75.0,
};

impl Default for VehicleConfig {
    fn default() -> Self {
        HATCHBACK
    }
}

/// Accepted tick rates in Hz: 1 ms to 10 s per tick.
pub const TICK_HZ_RANGE: RangeInclusive<f32> = 0.1..=1000.0;

impl VehicleConfig {
    /// Wall-clock period of one tick. Rates outside `TICK_HZ_RANGE` are
    /// clamped into it, so the period is never zero.
    pub fn tick_period(&self) -> Duration {
        let hz = if self.tick_hz.is_nan() {
            *TICK_HZ_RANGE.start()
        } else {
            self.tick_hz.clamp(*TICK_HZ_RANGE.start(), *TICK_HZ_RANGE.end())
        };
        Duration::from_secs_f64(1.0 / f64::from(hz))
    }
}
