//! No-op controller: holds the plate level.

use moab_types::{Action, State};

use crate::controller::Controller;

#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroController;

impl Controller for ZeroController {
    fn name(&self) -> &str {
        "zero"
    }

    fn invoke(&mut self, _state: &State) -> Action {
        Action::neutral()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_neutral() {
        let mut c = ZeroController;
        let off_centre = State {
            ball_detected: true,
            x: 0.05,
            y: -0.04,
            vel_x: 0.2,
            ..State::default()
        };
        assert!(c.invoke(&off_centre).is_neutral());
        assert!(c.invoke(&State::default()).is_neutral());
    }
}
