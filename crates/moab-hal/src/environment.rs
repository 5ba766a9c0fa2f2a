//! [`Environment`] – the scoped plate session, and [`MoabEnv`], its
//! implementation over a [`Plant`] and a [`StatusDevice`].
//!
//! # State machine
//!
//! ```text
//! open ──► Idle ──reset──► Running ──step──► Running
//!                   ▲          │
//!                   └──reset───┘
//! Idle / Running ──close──► Closed     (close is idempotent)
//! ```
//!
//! `step` outside `Running` fails with [`MoabError::NotRunning`]; any call
//! after `close` fails with [`MoabError::NotOpen`].  A hardware fault during
//! `step` leaves the session open: the caller decides whether to reset or
//! let the guard close it.
//!
//! [`MoabEnv`] closes itself on drop, so holding it in a local binding is
//! enough to guarantee the plate is levelled and powered down on every exit
//! path, including `?` propagation and unwinding.

use std::time::Duration;

use moab_types::{Action, Icon, MoabError, State, Text};
use tracing::{debug, info, warn};

use crate::pacer::{Pacer, PacingMode};
use crate::plant::{BallReading, Plant};
use crate::status_device::SharedDevice;

/// Mechanical tilt limit of the plate in degrees.  Every action is clipped
/// to this before it reaches the servos, whatever the controller asked for.
pub const PLATE_LIMIT_DEG: f32 = 22.0;

/// Lifecycle phase of an environment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvPhase {
    Idle,
    Running,
    Closed,
}

/// The sense/act session the run loop drives.
pub trait Environment {
    /// Show `icon`/`text`, (re)start an episode and return the first state.
    fn reset(&mut self, icon: Icon, text: Text) -> Result<State, MoabError>;

    /// Apply `action`, advance one paced control tick, return the next state.
    fn step(&mut self, action: Action) -> Result<State, MoabError>;

    /// Release the hardware.  Idempotent.
    fn close(&mut self) -> Result<(), MoabError>;

    fn phase(&self) -> EnvPhase;
}

/// Session parameters.
#[derive(Debug, Clone, Copy)]
pub struct EnvConfig {
    /// Control frequency in Hz.
    pub frequency: u32,
    /// Emit per-cycle diagnostics.
    pub debug: bool,
    pub pacing: PacingMode,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            frequency: 30,
            debug: false,
            pacing: PacingMode::RealTime,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MoabEnv
// ─────────────────────────────────────────────────────────────────────────────

/// Environment backed by a [`Plant`] and the shared status device.
pub struct MoabEnv {
    device: SharedDevice,
    plant: Box<dyn Plant>,
    pacer: Pacer,
    debug: bool,
    phase: EnvPhase,
    prev_position: Option<(f32, f32)>,
    sum: (f32, f32),
    tick: u64,
}

impl MoabEnv {
    /// Acquire the plant and device for a new session.
    ///
    /// # Errors
    ///
    /// Returns [`MoabError::InvalidConfig`] for an unusable frequency and
    /// [`MoabError::HardwareInit`] when the status device does not respond.
    pub fn open(
        device: SharedDevice,
        plant: Box<dyn Plant>,
        config: EnvConfig,
    ) -> Result<Self, MoabError> {
        let pacer = Pacer::new(config.frequency, config.pacing)?;
        device.display(Icon::Blank, Text::Blank).map_err(|e| {
            MoabError::HardwareInit(format!("status device '{}': {e}", device.id()))
        })?;

        info!(
            plant = plant.id(),
            device = device.id(),
            frequency = config.frequency,
            debug = config.debug,
            "environment opened"
        );

        Ok(Self {
            device,
            plant,
            pacer,
            debug: config.debug,
            phase: EnvPhase::Idle,
            prev_position: None,
            sum: (0.0, 0.0),
            tick: 0,
        })
    }

    fn period(&self) -> Duration {
        self.pacer.period()
    }

    fn cycle(&mut self, action: Action) -> Result<State, MoabError> {
        let action = action.clamped(PLATE_LIMIT_DEG);
        self.plant.apply(action)?;
        self.plant.advance(self.period());
        let slept = self.pacer.wait();
        let reading = self.plant.sense()?;
        let buttons = self.device.read_input()?;

        let mut state = self.derive(reading);
        state.buttons = buttons;
        state.tick = self.tick;
        self.tick += 1;

        if self.debug {
            debug!(
                tick = state.tick,
                detected = state.ball_detected,
                x = state.x,
                y = state.y,
                vel_x = state.vel_x,
                vel_y = state.vel_y,
                pitch = action.pitch,
                roll = action.roll,
                slept_ms = slept.as_secs_f64() * 1e3,
                "cycle"
            );
        }
        Ok(state)
    }

    fn derive(&mut self, reading: BallReading) -> State {
        if !reading.detected {
            self.prev_position = None;
            self.sum = (0.0, 0.0);
            return State::default();
        }

        let dt = self.period().as_secs_f32();
        let (vel_x, vel_y) = match self.prev_position {
            Some((px, py)) => ((reading.x - px) / dt, (reading.y - py) / dt),
            None => (0.0, 0.0),
        };
        self.prev_position = Some((reading.x, reading.y));
        self.sum.0 += reading.x * dt;
        self.sum.1 += reading.y * dt;

        State {
            ball_detected: true,
            x: reading.x,
            y: reading.y,
            vel_x,
            vel_y,
            sum_x: self.sum.0,
            sum_y: self.sum.1,
            ..State::default()
        }
    }
}

impl Environment for MoabEnv {
    fn reset(&mut self, icon: Icon, text: Text) -> Result<State, MoabError> {
        if self.phase == EnvPhase::Closed {
            return Err(MoabError::NotOpen);
        }
        self.device.display(icon, text)?;
        self.plant.activate()?;

        self.prev_position = None;
        self.sum = (0.0, 0.0);
        self.tick = 0;
        self.pacer.restart();
        self.phase = EnvPhase::Running;
        info!(%icon, %text, "environment reset");

        self.cycle(Action::neutral())
    }

    fn step(&mut self, action: Action) -> Result<State, MoabError> {
        match self.phase {
            EnvPhase::Running => self.cycle(action),
            EnvPhase::Idle => Err(MoabError::NotRunning {
                operation: "step".to_string(),
            }),
            EnvPhase::Closed => Err(MoabError::NotOpen),
        }
    }

    fn close(&mut self) -> Result<(), MoabError> {
        if self.phase == EnvPhase::Closed {
            return Ok(());
        }
        self.phase = EnvPhase::Closed;

        let plant_result = self.plant.shutdown();
        let device_result = self.device.display(Icon::Blank, Text::Blank);

        let stats = self.pacer.stats();
        info!(
            ticks = stats.ticks,
            overruns = stats.overruns,
            mean_period_ms = stats.mean_period().map(|p| p.as_secs_f64() * 1e3),
            "environment closed"
        );
        plant_result.and(device_result)
    }

    fn phase(&self) -> EnvPhase {
        self.phase
    }
}

impl Drop for MoabEnv {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "environment release failed");
        }
    }
}
