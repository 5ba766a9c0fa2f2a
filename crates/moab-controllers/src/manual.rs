//! Joystick-driven controller: the operator tilts the plate directly from
//! the status device.  The observed state is ignored.

use moab_hal::SharedDevice;
use moab_types::{Action, State};
use tracing::warn;

use crate::config::ManualConfig;
use crate::controller::Controller;

pub struct ManualController {
    device: SharedDevice,
    max_angle: f32,
}

impl ManualController {
    pub fn new(config: ManualConfig) -> Self {
        Self {
            device: config.device,
            max_angle: config.max_angle,
        }
    }
}

impl Controller for ManualController {
    fn name(&self) -> &str {
        "manual"
    }

    fn invoke(&mut self, _state: &State) -> Action {
        match self.device.read_input() {
            Ok(input) => Action::new(
                input.joy_y.clamp(-1.0, 1.0) * self.max_angle,
                input.joy_x.clamp(-1.0, 1.0) * self.max_angle,
            ),
            Err(e) => {
                warn!(error = %e, "joystick read failed; levelling plate");
                Action::neutral()
            }
        }
    }
}
