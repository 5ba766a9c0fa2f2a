//! `moab-hal` – hardware abstraction for the balancing plate.
//!
//! The only crate that touches (real or simulated) hardware.
//!
//! # Modules
//!
//! - [`status_device`] – [`StatusDevice`][status_device::StatusDevice]: the
//!   indicator hat (icon/text display + joystick), shared process-wide, and
//!   its simulated stand-in [`SimHat`][status_device::SimHat].
//! - [`plant`] – [`Plant`][plant::Plant]: the servo-driven plate and its
//!   ball sensor.
//! - [`sim`] – [`SimPlant`][sim::SimPlant]: deterministic ball-on-plate
//!   physics for running without hardware.
//! - [`pacer`] – [`Pacer`][pacer::Pacer]: deadline-based frequency
//!   discipline.
//! - [`environment`] – [`Environment`][environment::Environment] and
//!   [`MoabEnv`][environment::MoabEnv]: the scoped reset/step/close session
//!   the run loop drives.
//! - [`pid`] – [`PidController`][pid::PidController]: single-axis PID loop.

pub mod environment;
pub mod pacer;
pub mod pid;
pub mod plant;
pub mod sim;
pub mod status_device;

pub use environment::{EnvConfig, EnvPhase, Environment, MoabEnv, PLATE_LIMIT_DEG};
pub use pacer::{Pacer, PacerStats, PacingMode, period_for};
pub use pid::PidController;
pub use plant::{BallReading, Plant};
pub use sim::{SimPlant, SimProbe};
pub use status_device::{SharedDevice, SimHat, StatusDevice};
