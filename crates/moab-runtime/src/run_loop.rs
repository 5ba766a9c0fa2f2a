//! [`RunLoop`] – the sense → decide → act orchestrator.
//!
//! One call to [`RunLoop::run`]:
//!
//! 1. **Resolve** – look the controller name up in the
//!    [`ControllerRegistry`].  Bad names and bad numbers fail here, before
//!    any hardware is touched.
//! 2. **Acquire** – open the status device, build the controller from the
//!    superset [`ControllerConfig`], then open the environment inside an
//!    [`EnvGuard`].
//! 3. **Reset** – show the controller's icon and label and take the first
//!    observation.
//! 4. **Cycle** – `action = controller.invoke(state); state = env.step(action)`
//!    until the [`StopSignal`] is raised or the operator presses the menu
//!    button on the status device.
//!
//! The loop body has no error handling of its own.  A failing `step`
//! propagates out of `run`; the guard's `Drop` closes the environment on
//! the way, so the plate is levelled and powered down exactly once on every
//! exit path.

use std::time::Duration;

use moab_controllers::{Controller, ControllerConfig, ControllerRegistry, PidGains};
use moab_hal::{EnvConfig, EnvPhase, Environment, PacingMode, SharedDevice, period_for};
use moab_types::{Action, Icon, MoabError, State, Text};
use tracing::{info, instrument, warn};

use crate::stop::StopSignal;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Registry name of the controller to run.
    pub controller: String,
    /// Control frequency in Hz.
    pub frequency: u32,
    /// Largest plate tilt a controller may request, in degrees.
    pub max_angle: f32,
    /// Base URI for network-backed controllers.
    pub endpoint: String,
    /// Per-cycle diagnostics in the environment.
    pub debug: bool,
    pub pacing: PacingMode,
    pub pid_gains: PidGains,
    pub inference_timeout: Option<Duration>,
}

impl RunConfig {
    pub fn new(
        controller: impl Into<String>,
        frequency: u32,
        max_angle: f32,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            controller: controller.into(),
            frequency,
            max_angle,
            endpoint: endpoint.into(),
            debug: false,
            pacing: PacingMode::RealTime,
            pid_gains: PidGains::default(),
            inference_timeout: None,
        }
    }

    /// `http://localhost:<port>`, the inference endpoint for a local port.
    pub fn endpoint_for_port(port: u16) -> String {
        format!("http://localhost:{port}")
    }

    fn controller_config(&self, device: SharedDevice) -> ControllerConfig {
        let mut cfg = ControllerConfig::new(self.frequency, self.max_angle, &self.endpoint, device);
        cfg.pid_gains = self.pid_gains;
        cfg.inference_timeout = self.inference_timeout;
        cfg
    }

    fn env_config(&self) -> EnvConfig {
        EnvConfig {
            frequency: self.frequency,
            debug: self.debug,
            pacing: self.pacing,
        }
    }

    fn validate(&self) -> Result<(), MoabError> {
        period_for(self.frequency)?;
        if !(self.max_angle.is_finite() && self.max_angle > 0.0) {
            return Err(MoabError::InvalidConfig(format!(
                "max angle must be a positive number of degrees, got {}",
                self.max_angle
            )));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Why a run ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The [`StopSignal`] was raised (Ctrl-C, SIGTERM, a test harness).
    Signal,
    /// The operator pressed the menu button on the status device.
    MenuButton,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub controller: String,
    /// Completed invoke → step cycles after the reset.
    pub cycles: u64,
    pub stop_reason: StopReason,
}

// ─────────────────────────────────────────────────────────────────────────────
// EnvGuard
// ─────────────────────────────────────────────────────────────────────────────

/// Scoped ownership of an [`Environment`]: closes it when dropped unless it
/// was already closed.
pub struct EnvGuard<E: Environment> {
    env: E,
}

impl<E: Environment> EnvGuard<E> {
    pub fn new(env: E) -> Self {
        Self { env }
    }

    pub fn reset(&mut self, icon: Icon, text: Text) -> Result<State, MoabError> {
        self.env.reset(icon, text)
    }

    pub fn step(&mut self, action: Action) -> Result<State, MoabError> {
        self.env.step(action)
    }

    /// Close now and surface any release error, instead of only logging it
    /// from `Drop`.
    pub fn close(mut self) -> Result<(), MoabError> {
        self.env.close()
    }
}

impl<E: Environment> Drop for EnvGuard<E> {
    fn drop(&mut self) {
        if self.env.phase() == EnvPhase::Closed {
            return;
        }
        if let Err(e) = self.env.close() {
            warn!(error = %e, "environment close failed during unwind");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RunLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the controller registry and the stop signal for one process.
pub struct RunLoop {
    registry: ControllerRegistry,
    stop: StopSignal,
}

impl RunLoop {
    pub fn new(registry: ControllerRegistry, stop: StopSignal) -> Self {
        Self { registry, stop }
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    /// A handle that stops this loop when raised.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Run `config.controller` until stopped.
    ///
    /// `open_device` acquires the status device; `open_env` opens the
    /// environment on that device.  Neither is called when the controller
    /// name or the numeric parameters are invalid.
    ///
    /// # Errors
    ///
    /// - [`MoabError::UnknownController`] / [`MoabError::InvalidConfig`]
    ///   before any resource is acquired.
    /// - Whatever `open_device`, the controller factory or `open_env`
    ///   return (e.g. [`MoabError::DeviceUnavailable`],
    ///   [`MoabError::HardwareInit`]).
    /// - The first error from `reset` or `step` (e.g.
    ///   [`MoabError::HardwareIo`]), after the environment has been closed.
    #[instrument(skip_all, fields(controller = %config.controller))]
    pub fn run<D, O, E>(
        &self,
        config: &RunConfig,
        open_device: D,
        open_env: O,
    ) -> Result<RunReport, MoabError>
    where
        D: FnOnce() -> Result<SharedDevice, MoabError>,
        O: FnOnce(SharedDevice, EnvConfig) -> Result<E, MoabError>,
        E: Environment,
    {
        config.validate()?;
        let descriptor = self.registry.resolve(&config.controller)?;

        let device = open_device()?;
        let mut controller = descriptor.build(&config.controller_config(device.clone()))?;
        info!(
            controller = controller.name(),
            icon = %descriptor.icon,
            text = %descriptor.text,
            frequency = config.frequency,
            max_angle = config.max_angle,
            "controller selected"
        );

        let mut env = EnvGuard::new(open_env(device, config.env_config())?);
        let mut state = env.reset(descriptor.icon, descriptor.text)?;

        let mut cycles: u64 = 0;
        let stop_reason = loop {
            if self.stop.is_raised() {
                break StopReason::Signal;
            }
            if state.buttons.menu_button {
                break StopReason::MenuButton;
            }
            let action = controller.invoke(&state);
            state = env.step(action)?;
            cycles += 1;
        };

        env.close()?;
        info!(cycles, reason = ?stop_reason, "run loop stopped");
        Ok(RunReport {
            controller: descriptor.name.clone(),
            cycles,
            stop_reason,
        })
    }
}
