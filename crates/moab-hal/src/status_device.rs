//! `StatusDevice` trait for the plate's indicator hat (display + joystick),
//! and [`SimHat`], the in-process stand-in used without hardware.
//!
//! One device handle exists per process.  It is shared between the run loop
//! (the manual controller reads the joystick) and the environment (which
//! renders the controller's icon and label), so the trait takes `&self` and
//! implementations synchronise internally.

use std::sync::{Arc, Mutex, MutexGuard};

use moab_types::{Buttons, Icon, MoabError, Text};
use tracing::debug;

/// Shared handle to the process-wide status device.
pub type SharedDevice = Arc<dyn StatusDevice>;

/// A status indicator with operator input.
pub trait StatusDevice: Send + Sync {
    /// Stable identifier used in fault messages, e.g. `"hat"`.
    fn id(&self) -> &str;

    /// Render `icon` next to `text`.
    ///
    /// # Errors
    ///
    /// Returns [`MoabError::HardwareIo`] if the display cannot be updated.
    fn display(&self, icon: Icon, text: Text) -> Result<(), MoabError>;

    /// Sample the buttons and joystick.
    ///
    /// # Errors
    ///
    /// Returns [`MoabError::HardwareIo`] if the input cannot be read.
    fn read_input(&self) -> Result<Buttons, MoabError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// SimHat
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct HatState {
    icon: Option<Icon>,
    text: Option<Text>,
    input: Buttons,
    renders: usize,
    faulted: bool,
}

/// Simulated hat that records what is displayed and returns operator input
/// injected through [`SimHat::set_input`].
#[derive(Debug, Default)]
pub struct SimHat {
    state: Mutex<HatState>,
}

impl SimHat {
    /// Acquire the simulated device.
    ///
    /// Never fails; the `Result` mirrors the signature a hardware driver
    /// would have.
    pub fn open() -> Result<Arc<Self>, MoabError> {
        debug!("simulated hat opened");
        Ok(Arc::new(Self::default()))
    }

    /// Replace the operator input returned by subsequent reads.
    pub fn set_input(&self, input: Buttons) {
        self.lock().input = input;
    }

    /// Make every subsequent display/read fail with a hardware fault.
    pub fn set_faulted(&self, faulted: bool) {
        self.lock().faulted = faulted;
    }

    /// The most recently rendered presentation, if any.
    pub fn presentation(&self) -> Option<(Icon, Text)> {
        let state = self.lock();
        state.icon.zip(state.text)
    }

    /// Number of display updates since the device was opened.
    pub fn render_count(&self) -> usize {
        self.lock().renders
    }

    fn lock(&self) -> MutexGuard<'_, HatState> {
        // A poisoned lock only means a panicking test thread held it; the
        // recorded state is still plain data.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fault(&self, details: &str) -> MoabError {
        MoabError::HardwareIo {
            component: self.id().to_string(),
            details: details.to_string(),
        }
    }
}

impl StatusDevice for SimHat {
    fn id(&self) -> &str {
        "sim_hat"
    }

    fn display(&self, icon: Icon, text: Text) -> Result<(), MoabError> {
        let mut state = self.lock();
        if state.faulted {
            return Err(self.fault("display write failed"));
        }
        state.icon = Some(icon);
        state.text = Some(text);
        state.renders += 1;
        Ok(())
    }

    fn read_input(&self) -> Result<Buttons, MoabError> {
        let state = self.lock();
        if state.faulted {
            return Err(self.fault("input read failed"));
        }
        Ok(state.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_records_presentation() {
        let hat = SimHat::open().unwrap();
        assert_eq!(hat.presentation(), None);

        hat.display(Icon::Dot, Text::Classic).unwrap();
        assert_eq!(hat.presentation(), Some((Icon::Dot, Text::Classic)));
        assert_eq!(hat.render_count(), 1);
    }

    #[test]
    fn injected_input_is_read_back() {
        let hat = SimHat::open().unwrap();
        assert_eq!(hat.read_input().unwrap(), Buttons::default());

        hat.set_input(Buttons {
            joy_x: 0.5,
            joy_y: -1.0,
            ..Buttons::default()
        });
        let input = hat.read_input().unwrap();
        assert!((input.joy_x - 0.5).abs() < f32::EPSILON);
        assert!((input.joy_y + 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn faulted_hat_returns_hardware_io() {
        let hat = SimHat::open().unwrap();
        hat.set_faulted(true);
        assert!(matches!(
            hat.display(Icon::Dot, Text::Blank),
            Err(MoabError::HardwareIo { .. })
        ));
        assert!(matches!(hat.read_input(), Err(MoabError::HardwareIo { .. })));
    }

    #[test]
    fn shared_handle_sees_same_state() {
        let hat = SimHat::open().unwrap();
        let shared: SharedDevice = hat.clone();
        shared.display(Icon::Check, Text::Brain).unwrap();
        assert_eq!(hat.presentation(), Some((Icon::Check, Text::Brain)));
    }
}
