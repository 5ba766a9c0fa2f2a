//! The superset configuration handed to every controller factory, and the
//! per-variant subsets each controller actually consumes.
//!
//! A factory never reads [`ControllerConfig`] directly: it converts it into
//! its own config type first, which makes the fields each variant depends
//! on explicit instead of silently ignoring the rest.

use std::fmt;
use std::time::Duration;

use moab_hal::SharedDevice;
use serde::{Deserialize, Serialize};

/// Gains for the classical feedback controller, in degrees per metre
/// (kp), degrees per metre-second (ki) and degrees per metre/second (kd).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 75.0,
            ki: 0.5,
            kd: 45.0,
        }
    }
}

/// Everything any controller might need.
#[derive(Clone)]
pub struct ControllerConfig {
    /// Control frequency in Hz.
    pub frequency: u32,
    /// Largest plate tilt a controller may request, in degrees.
    pub max_angle: f32,
    /// Base URI of the inference service, e.g. `http://localhost:5000`.
    pub endpoint: String,
    /// The process-wide status device.
    pub device: SharedDevice,
    pub pid_gains: PidGains,
    /// Upper bound on one inference round-trip.  `None` means half the
    /// control period.
    pub inference_timeout: Option<Duration>,
}

impl ControllerConfig {
    pub fn new(
        frequency: u32,
        max_angle: f32,
        endpoint: impl Into<String>,
        device: SharedDevice,
    ) -> Self {
        Self {
            frequency,
            max_angle,
            endpoint: endpoint.into(),
            device,
            pid_gains: PidGains::default(),
            inference_timeout: None,
        }
    }

    /// Nominal control period, `1 / frequency`.
    pub fn period(&self) -> Duration {
        Duration::from_secs(1) / self.frequency.max(1)
    }
}

impl fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("frequency", &self.frequency)
            .field("max_angle", &self.max_angle)
            .field("endpoint", &self.endpoint)
            .field("device", &self.device.id())
            .field("pid_gains", &self.pid_gains)
            .field("inference_timeout", &self.inference_timeout)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-variant subsets
// ─────────────────────────────────────────────────────────────────────────────

/// Inputs of the classical feedback controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidConfig {
    pub gains: PidGains,
    pub max_angle: f32,
    /// Seconds per control tick.
    pub dt: f32,
}

impl From<&ControllerConfig> for PidConfig {
    fn from(cfg: &ControllerConfig) -> Self {
        Self {
            gains: cfg.pid_gains,
            max_angle: cfg.max_angle,
            dt: cfg.period().as_secs_f32(),
        }
    }
}

/// Inputs of the learned-policy controller.
#[derive(Debug, Clone, PartialEq)]
pub struct BrainConfig {
    pub endpoint: String,
    pub max_angle: f32,
    pub timeout: Duration,
}

impl From<&ControllerConfig> for BrainConfig {
    fn from(cfg: &ControllerConfig) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            max_angle: cfg.max_angle,
            timeout: cfg.inference_timeout.unwrap_or(cfg.period() / 2),
        }
    }
}

/// Inputs of the joystick-driven controller.
#[derive(Clone)]
pub struct ManualConfig {
    pub device: SharedDevice,
    pub max_angle: f32,
}

impl From<&ControllerConfig> for ManualConfig {
    fn from(cfg: &ControllerConfig) -> Self {
        Self {
            device: cfg.device.clone(),
            max_angle: cfg.max_angle,
        }
    }
}
