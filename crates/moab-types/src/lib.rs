//! `moab-types` – shared vocabulary for the Moab balancing-plate controller.
//!
//! Every other crate in the workspace speaks in these types: the
//! [`State`] observed by the environment, the [`Action`] a controller emits,
//! the [`Icon`]/[`Text`] presentation shown on the status device, and the
//! process-wide [`MoabError`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Presentation
// ─────────────────────────────────────────────────────────────────────────────

/// Icon rendered on the status device next to the controller label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Icon {
    Dot,
    Blank,
    Check,
    X,
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Icon::Dot => write!(f, "dot"),
            Icon::Blank => write!(f, "blank"),
            Icon::Check => write!(f, "check"),
            Icon::X => write!(f, "x"),
        }
    }
}

/// Text label rendered on the status device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Text {
    Classic,
    Blank,
    Brain,
    Manual,
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Text::Classic => write!(f, "classic"),
            Text::Blank => write!(f, "blank"),
            Text::Brain => write!(f, "brain"),
            Text::Manual => write!(f, "manual"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Observation / command
// ─────────────────────────────────────────────────────────────────────────────

/// Operator input read from the status device.
///
/// Joystick axes are normalised to `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Buttons {
    pub menu_button: bool,
    pub joy_button: bool,
    pub joy_x: f32,
    pub joy_y: f32,
}

/// One observation of the plate, produced by the environment on every
/// `reset` and `step`.
///
/// Positions are metres from the plate centre.  Velocities are finite
/// differences over the nominal control period and the sums are the running
/// integral of position; both are cleared whenever the ball is lost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub ball_detected: bool,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub sum_x: f32,
    pub sum_y: f32,
    pub buttons: Buttons,
    /// Steps taken since the last reset.
    pub tick: u64,
}

/// Plate command in degrees.
///
/// Positive `pitch` raises the +y edge of the plate, so the ball accelerates
/// toward −y.  Positive `roll` raises the +x edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub pitch: f32,
    pub roll: f32,
}

impl Action {
    pub fn new(pitch: f32, roll: f32) -> Self {
        Self { pitch, roll }
    }

    /// A level plate.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Clip both axes to `[-limit, limit]`.  Non-finite components become 0.
    pub fn clamped(self, limit: f32) -> Self {
        let clip = |v: f32| if v.is_finite() { v.clamp(-limit, limit) } else { 0.0 };
        Self {
            pitch: clip(self.pitch),
            roll: clip(self.roll),
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.pitch == 0.0 && self.roll == 0.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Process-wide error type spanning configuration, resource acquisition,
/// per-cycle hardware faults, and controller failures.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MoabError {
    #[error("Unknown controller '{name}' (available: {})", available.join(", "))]
    UnknownController { name: String, available: Vec<String> },

    #[error("Controller '{0}' is registered more than once")]
    DuplicateController(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Status device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Hardware initialisation failed: {0}")]
    HardwareInit(String),

    #[error("Hardware I/O fault on {component}: {details}")]
    HardwareIo { component: String, details: String },

    #[error("Environment is not open")]
    NotOpen,

    #[error("Environment must be reset before {operation}")]
    NotRunning { operation: String },

    #[error("Controller initialisation failed: {0}")]
    ControllerInit(String),

    #[error("Controller inference failed: {0}")]
    ControllerInference(String),
}

impl MoabError {
    /// `true` for errors caused by bad user input rather than hardware.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            MoabError::UnknownController { .. }
                | MoabError::DuplicateController(_)
                | MoabError::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icon_and_text_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Icon::Dot).unwrap(), "\"dot\"");
        assert_eq!(serde_json::to_string(&Text::Classic).unwrap(), "\"classic\"");
        let back: Text = serde_json::from_str("\"brain\"").unwrap();
        assert_eq!(back, Text::Brain);
    }

    #[test]
    fn display_matches_serde_label() {
        assert_eq!(Icon::Check.to_string(), "check");
        assert_eq!(Text::Manual.to_string(), "manual");
    }

    #[test]
    fn neutral_action_is_level() {
        let a = Action::neutral();
        assert!(a.is_neutral());
        assert_eq!(a, Action::new(0.0, 0.0));
    }

    #[test]
    fn clamped_limits_both_axes() {
        let a = Action::new(30.0, -40.0).clamped(16.0);
        assert_eq!(a, Action::new(16.0, -16.0));

        let inside = Action::new(3.0, -4.0).clamped(16.0);
        assert_eq!(inside, Action::new(3.0, -4.0));
    }

    #[test]
    fn clamped_zeroes_non_finite_components() {
        let a = Action::new(f32::NAN, f32::INFINITY).clamped(10.0);
        assert!(a.is_neutral());
    }

    #[test]
    fn unknown_controller_lists_available_names() {
        let err = MoabError::UnknownController {
            name: "bogus".to_string(),
            available: vec!["pid".to_string(), "zero".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("bogus"));
        assert!(msg.contains("pid, zero"));
        assert!(err.is_usage_error());
    }

    #[test]
    fn hardware_io_is_not_a_usage_error() {
        let err = MoabError::HardwareIo {
            component: "servo".to_string(),
            details: "timeout".to_string(),
        };
        assert!(err.to_string().contains("servo"));
        assert!(!err.is_usage_error());
    }

    #[test]
    fn state_roundtrip_preserves_buttons() {
        let state = State {
            ball_detected: true,
            x: 0.01,
            buttons: Buttons {
                menu_button: true,
                ..Buttons::default()
            },
            tick: 7,
            ..State::default()
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
