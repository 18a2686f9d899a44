// Fixed-rate tick loop. Sole owner of the `Simulation`.
//
// Control events arrive over an mpsc channel and are drained at each tick
// boundary, so an event is never applied halfway through a step.

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::bus::SnapshotBus;
use crate::physics::Simulation;
use crate::state::ControlEvent;

pub async fn run(mut sim: Simulation, bus: SnapshotBus, mut controls: UnboundedReceiver<ControlEvent>) {
    let period = sim.config().tick_period();
    info!(tick_hz = sim.config().tick_hz, ?period, "simulation running");

    // Skip: stay on the fixed grid after a stall, no catch-up burst.
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        while let Ok(event) = controls.try_recv() {
            debug!(action = event.action.as_str(), active = event.active, "control");
            sim.apply_control(event);
        }

        let snapshot = sim.step();
        bus.publish(snapshot);
    }
}
