// src/physics.rs
//
// Fixed-tick vehicle model. One `Simulation` is owned by the scheduler loop:
// control events are applied between ticks, `step()` advances one tick.
//
// Tick order:
// 1) gear transition (reads speed from the previous tick)
// 2) speed update for the new gear
// 3) engine speed derived from the new speed
//
// Nothing in here can fail. Out-of-range results are clamped.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::state::{ControlEvent, InputState, Snapshot};
use crate::vehicle::{Gear, VehicleConfig, VehicleState};

pub struct Simulation {
    vehicle: VehicleState,
    input: InputState,
    config: VehicleConfig,
    tick: u64,
    rng: StdRng,
}

impl Simulation {
    pub fn new(config: VehicleConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic idle jitter, for tests and replays.
    pub fn with_seed(config: VehicleConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: VehicleConfig, rng: StdRng) -> Self {
        Self {
            vehicle: VehicleState::at_rest(&config),
            input: InputState::default(),
            config,
            tick: 0,
            rng,
        }
    }

    /// Start from an arbitrary state instead of standstill. Values are clamped
    /// into range the same way a tick would.
    pub fn with_vehicle(mut self, mut vehicle: VehicleState) -> Self {
        vehicle.speed = vehicle.speed.max(0.0).min(self.config.max_speed);
        vehicle.engine_speed = clamp_rpm(vehicle.engine_speed, &self.config);
        vehicle.fuel = vehicle.fuel.clamp(0.0, 100.0);
        self.vehicle = vehicle;
        self
    }

    pub fn vehicle(&self) -> &VehicleState {
        &self.vehicle
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Level-triggered: only the latest value per action matters at the next tick.
    pub fn apply_control(&mut self, event: ControlEvent) {
        self.input.set(event.action, event.active);
    }

    /// Advance one tick and return the snapshot to publish.
    pub fn step(&mut self) -> Snapshot {
        let input = self.input;
        let cfg = &self.config;
        let v = &mut self.vehicle;

        v.gear = next_gear(v.gear, v.speed, &input);
        v.speed = next_speed(v.gear, v.speed, &input, cfg);

        let jitter = self.rng.r#gen::<f32>();
        v.engine_speed = engine_speed(v.gear, v.speed, &input, cfg, jitter);

        self.tick += 1;
        Snapshot::capture(self.tick, v)
    }
}

// ---------------------------------------------------------
// Gear state machine
// ---------------------------------------------------------
// Reverse is only entered at standstill, and sticks until the car is
// stopped again with reverse released.
pub fn next_gear(gear: Gear, speed: f32, input: &InputState) -> Gear {
    let stopped = speed <= 0.0;

    if stopped && input.reversing {
        Gear::Reverse
    } else if !stopped || input.accelerating {
        if gear == Gear::Reverse { Gear::Reverse } else { Gear::Drive }
    } else {
        Gear::Park
    }
}

// ---------------------------------------------------------
// Speed model
// ---------------------------------------------------------
pub fn next_speed(gear: Gear, speed: f32, input: &InputState, cfg: &VehicleConfig) -> f32 {
    let next = match gear {
        Gear::Reverse => {
            if input.accelerating {
                // hold at the reverse limit while the throttle stays down
                if speed < cfg.reverse_max {
                    (speed + cfg.reverse_accel_rate).min(cfg.reverse_max)
                } else {
                    speed
                }
            } else {
                speed - cfg.reverse_accel_rate
            }
        }
        Gear::Drive | Gear::Park => {
            if input.accelerating {
                speed + cfg.accel_rate
            } else if input.braking {
                speed - cfg.brake_rate
            } else {
                speed - cfg.friction_rate
            }
        }
    };

    next.max(0.0).min(cfg.max_speed)
}

// ---------------------------------------------------------
// Engine speed model
// ---------------------------------------------------------
// `jitter` is a unit sample in [0, 1) scaled by `idle_jitter`.
pub fn engine_speed(
    gear: Gear,
    speed: f32,
    input: &InputState,
    cfg: &VehicleConfig,
    jitter: f32,
) -> f32 {
    let rpm = if speed <= 0.0 {
        if input.accelerating && gear == Gear::Park {
            cfg.park_rev_rpm
        } else {
            cfg.idle_rpm + jitter.clamp(0.0, 1.0) * cfg.idle_jitter
        }
    } else {
        // sawtooth across notional gear ratios
        let in_window = if cfg.gear_window > 0.0 { speed % cfg.gear_window } else { speed };
        let mut base = in_window * cfg.rpm_per_speed + cfg.rpm_base;
        if input.accelerating {
            base += cfg.load_rpm;
        }
        base
    };

    clamp_rpm(rpm, cfg)
}

#[inline]
fn clamp_rpm(rpm: f32, cfg: &VehicleConfig) -> f32 {
    // max/min rather than clamp: never panics on a bad config
    rpm.max(cfg.idle_rpm).min(cfg.redline_rpm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ControlAction;
    use crate::vehicle::HATCHBACK;
    use approx::assert_relative_eq;

    fn press(sim: &mut Simulation, action: ControlAction, active: bool) {
        sim.apply_control(ControlEvent { action, active });
    }

    fn sim() -> Simulation {
        Simulation::with_seed(HATCHBACK, 7)
    }

    fn moving(speed: f32, gear: Gear) -> VehicleState {
        VehicleState { speed, gear, ..VehicleState::at_rest(&HATCHBACK) }
    }

    #[test]
    fn idle_in_park_without_input() {
        let mut sim = sim();
        for _ in 0..10 {
            let snap = sim.step();
            assert_eq!(snap.gear, Gear::Park);
            assert_eq!(snap.speed, 0.0);
            assert!(snap.rpm >= 800.0 && snap.rpm < 820.0);
        }
        assert_eq!(sim.tick(), 10);
    }

    #[test]
    fn controls_land_in_input_without_stepping() {
        let mut sim = sim();
        press(&mut sim, ControlAction::Brake, true);
        press(&mut sim, ControlAction::Reverse, true);
        press(&mut sim, ControlAction::Brake, false);

        let input = sim.input();
        assert!(input.reversing);
        assert!(!input.braking);
        assert!(!input.accelerating);
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.vehicle().gear, Gear::Park);
    }

    #[test]
    fn accelerating_from_park() {
        let mut sim = sim();
        press(&mut sim, ControlAction::Accelerate, true);

        let n = 50;
        for i in 1..=n {
            let snap = sim.step();
            assert_eq!(snap.gear, Gear::Drive);
            assert_relative_eq!(snap.speed, 0.8 * i as f32, epsilon = 1e-3);
        }
        assert_relative_eq!(sim.vehicle().speed, 40.0, epsilon = 1e-3);
    }

    #[test]
    fn acceleration_saturates_at_max_speed() {
        let mut sim = sim();
        press(&mut sim, ControlAction::Accelerate, true);

        for _ in 0..400 {
            let snap = sim.step();
            assert!(snap.speed <= HATCHBACK.max_speed);
        }
        assert_eq!(sim.vehicle().speed, HATCHBACK.max_speed);
    }

    #[test]
    fn braking_to_a_stop_then_park() {
        let mut sim = sim().with_vehicle(moving(100.0, Gear::Drive));
        press(&mut sim, ControlAction::Brake, true);

        let mut last = sim.vehicle().speed;
        for _ in 0..40 {
            let snap = sim.step();
            assert_eq!(snap.gear, Gear::Drive);
            assert!(snap.speed < last);
            assert!(snap.speed >= 0.0);
            last = snap.speed;
        }
        assert_eq!(sim.vehicle().speed, 0.0);

        // no further input: next tick parks
        press(&mut sim, ControlAction::Brake, false);
        let snap = sim.step();
        assert_eq!(snap.gear, Gear::Park);
        assert_eq!(snap.speed, 0.0);
    }

    #[test]
    fn braking_clamps_at_zero() {
        let mut sim = sim().with_vehicle(moving(1.0, Gear::Drive));
        press(&mut sim, ControlAction::Brake, true);
        let snap = sim.step();
        assert_eq!(snap.speed, 0.0);
    }

    #[test]
    fn brake_beats_coasting() {
        let input = InputState { braking: true, ..Default::default() };
        let braked = next_speed(Gear::Drive, 50.0, &input, &HATCHBACK);
        let coasted = next_speed(Gear::Drive, 50.0, &InputState::default(), &HATCHBACK);
        assert!(braked < coasted);
        assert_relative_eq!(coasted, 49.8, epsilon = 1e-4);
    }

    #[test]
    fn reverse_then_accelerate_caps_at_reverse_max() {
        let mut sim = sim();
        press(&mut sim, ControlAction::Reverse, true);
        press(&mut sim, ControlAction::Accelerate, true);

        let snap = sim.step();
        assert_eq!(snap.gear, Gear::Reverse);

        let mut last = snap.speed;
        for _ in 0..200 {
            let snap = sim.step();
            assert_eq!(snap.gear, Gear::Reverse);
            assert!(snap.speed <= HATCHBACK.reverse_max);
            assert!(snap.speed >= last);
            last = snap.speed;
        }
        assert_eq!(sim.vehicle().speed, HATCHBACK.reverse_max);
    }

    #[test]
    fn reverse_persists_until_stopped_and_released() {
        let mut sim = sim();
        press(&mut sim, ControlAction::Reverse, true);
        press(&mut sim, ControlAction::Accelerate, true);
        for _ in 0..10 {
            sim.step();
        }
        assert_relative_eq!(sim.vehicle().speed, 5.0, epsilon = 1e-4);

        // releasing reverse while rolling keeps R
        press(&mut sim, ControlAction::Reverse, false);
        press(&mut sim, ControlAction::Accelerate, false);
        for _ in 0..10 {
            let snap = sim.step();
            assert_eq!(snap.gear, Gear::Reverse);
        }
        assert_eq!(sim.vehicle().speed, 0.0);

        let snap = sim.step();
        assert_eq!(snap.gear, Gear::Park);
    }

    #[test]
    fn reverse_is_not_entered_while_moving() {
        let mut sim = sim().with_vehicle(moving(30.0, Gear::Drive));
        press(&mut sim, ControlAction::Reverse, true);
        let snap = sim.step();
        assert_eq!(snap.gear, Gear::Drive);
    }

    #[test]
    fn rpm_follows_gear_window_with_load() {
        let cruise = InputState::default();
        let load = InputState { accelerating: true, ..Default::default() };

        // 70 km/h -> 10 into the second window
        assert_relative_eq!(engine_speed(Gear::Drive, 70.0, &cruise, &HATCHBACK, 0.0), 2000.0);
        assert_relative_eq!(engine_speed(Gear::Drive, 70.0, &load, &HATCHBACK, 0.0), 2500.0);
    }

    #[test]
    fn rpm_clamped_to_redline() {
        let load = InputState { accelerating: true, ..Default::default() };
        assert_eq!(engine_speed(Gear::Drive, 59.9, &load, &HATCHBACK, 0.0), 7000.0);
    }

    #[test]
    fn revving_in_park_with_no_load() {
        let load = InputState { accelerating: true, ..Default::default() };
        assert_eq!(engine_speed(Gear::Park, 0.0, &load, &HATCHBACK, 0.5), 3000.0);
        assert_eq!(engine_speed(Gear::Park, 0.0, &InputState::default(), &HATCHBACK, 0.5), 810.0);
    }

    #[test]
    fn with_vehicle_clamps_out_of_range_state() {
        let sim = sim().with_vehicle(VehicleState {
            speed: -4.0,
            engine_speed: 99_999.0,
            ..VehicleState::at_rest(&HATCHBACK)
        });
        assert_eq!(sim.vehicle().speed, 0.0);
        assert_eq!(sim.vehicle().engine_speed, 7000.0);
    }
}
