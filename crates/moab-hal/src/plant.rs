//! Generic `Plant` trait for the physical (or simulated) plate: two servo
//! axes that tilt it and a sensor that locates the ball.
//!
//! The environment is the only caller.  It drives the plant through
//! `activate → (apply → advance → sense)* → shutdown`.

use std::time::Duration;

use moab_types::{Action, MoabError};

/// Where the sensor saw the ball, in metres from the plate centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallReading {
    pub detected: bool,
    pub x: f32,
    pub y: f32,
}

impl BallReading {
    pub fn lost() -> Self {
        Self {
            detected: false,
            x: 0.0,
            y: 0.0,
        }
    }
}

/// The actuated plate plus its ball sensor.
pub trait Plant: Send {
    /// Stable identifier used in fault messages, e.g. `"plate"`.
    fn id(&self) -> &str;

    /// Power the servos and level the plate.  Called on every reset.
    ///
    /// # Errors
    ///
    /// Returns [`MoabError::HardwareIo`] if the servos do not respond.
    fn activate(&mut self) -> Result<(), MoabError>;

    /// Command the plate to `action` (degrees, already within hardware
    /// limits).
    ///
    /// # Errors
    ///
    /// Returns [`MoabError::HardwareIo`] on an actuator fault.
    fn apply(&mut self, action: Action) -> Result<(), MoabError>;

    /// Let `dt` of plant time elapse.  Real hardware does nothing here; a
    /// simulation integrates its dynamics.
    fn advance(&mut self, dt: Duration);

    /// Locate the ball.
    ///
    /// # Errors
    ///
    /// Returns [`MoabError::HardwareIo`] on a sensor fault.
    fn sense(&mut self) -> Result<BallReading, MoabError>;

    /// Level the plate and power the servos down.
    ///
    /// # Errors
    ///
    /// Returns [`MoabError::HardwareIo`] if the servos do not respond.
    fn shutdown(&mut self) -> Result<(), MoabError>;
}
