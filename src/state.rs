use serde::{Deserialize, Serialize};

use crate::vehicle::{Gear, VehicleState};

// ---------------------------------------------
// DRIVER CONTROLS
// ---------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Accelerate,
    Brake,
    Reverse,
}

impl ControlAction {
    /// Unknown names yield `None` and are dropped by the caller.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "accelerate" => Some(ControlAction::Accelerate),
            "brake" => Some(ControlAction::Brake),
            "reverse" => Some(ControlAction::Reverse),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Accelerate => "accelerate",
            ControlAction::Brake => "brake",
            ControlAction::Reverse => "reverse",
        }
    }
}

/// A level change for one control: `active` is "currently held".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEvent {
    pub action: ControlAction,
    pub active: bool,
}

/// Held/released status of every control, read once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub accelerating: bool,
    pub braking: bool,
    pub reversing: bool,
}

impl InputState {
    /// Overwrite one level. Repeats collapse to the latest value.
    pub fn set(&mut self, action: ControlAction, active: bool) {
        match action {
            ControlAction::Accelerate => self.accelerating = active,
            ControlAction::Brake => self.braking = active,
            ControlAction::Reverse => self.reversing = active,
        }
    }
}

// ---------------------------------------------
// SNAPSHOT SENT TO EVERY OBSERVER
// ---------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tick: u64,
    pub speed: f32,
    pub rpm: f32,
    pub gear: Gear,
    pub temp: f32,
    pub fuel: f32,
}

impl Snapshot {
    pub fn capture(tick: u64, vehicle: &VehicleState) -> Self {
        Self {
            tick,
            speed: vehicle.speed,
            rpm: vehicle.engine_speed,
            gear: vehicle.gear,
            temp: vehicle.temperature,
            fuel: vehicle.fuel,
        }
    }
}

/// Every frame the server sends, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome { observer_id: String },
    CarSignal(Snapshot),
    Pong,
}

impl ServerMessage {
    pub fn to_json(&self) -> String {
        // Plain structs and enums: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
