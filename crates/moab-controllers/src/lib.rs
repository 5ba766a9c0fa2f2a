//! `moab-controllers` – the selectable plate-balancing policies.
//!
//! # Modules
//!
//! - [`controller`] – the [`Controller`] capability and [`ControllerKind`],
//!   the tagged variant the run loop holds.
//! - [`config`] – [`ControllerConfig`], the superset bundle every factory
//!   receives, and the per-variant subsets built from it.
//! - [`zero`], [`classic`], [`brain`], [`manual`] – the four built-in
//!   policies: level plate, PID feedback, HTTP-served learned policy, and
//!   joystick.
//! - [`registry`] – [`ControllerRegistry`]: name → factory + icon + text.

pub mod brain;
pub mod classic;
pub mod config;
pub mod controller;
pub mod manual;
pub mod registry;
pub mod zero;

pub use brain::{BrainController, BrainError};
pub use classic::PidBalancer;
pub use config::{BrainConfig, ControllerConfig, ManualConfig, PidConfig, PidGains};
pub use controller::{Controller, ControllerKind};
pub use manual::ManualController;
pub use registry::{ControllerDescriptor, ControllerFactory, ControllerRegistry, ControllerRegistryBuilder};
pub use zero::ZeroController;
