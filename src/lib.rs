//! Vehicle telemetry simulator and adaptive dashboard engine.
//!
//! The server side owns a [`physics::Simulation`] advanced on a fixed tick by
//! [`scheduler::run`] and fans snapshots out over [`bus::SnapshotBus`] to
//! websocket observers ([`net`]). Each observer runs an
//! [`observer::ObserverSession`] that derives a [`mode::DriverMode`] from speed
//! and lays out dashboard widgets through [`layout::LayoutPolicy`].

pub mod bus;
pub mod client;
pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod mode;
pub mod net;
pub mod observer;
pub mod physics;
pub mod scheduler;
pub mod state;
pub mod vehicle;
