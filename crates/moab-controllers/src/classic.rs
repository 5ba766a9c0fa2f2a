//! Classical feedback balancer: one [`PidController`] per plate axis.
//!
//! The y position drives pitch and the x position drives roll.  Both loops
//! hold a set-point of zero (plate centre); their outputs are negated so a
//! ball at +y yields positive pitch, which raises the +y edge and rolls the
//! ball back toward the centre.

use moab_hal::PidController;
use moab_types::{Action, State};

use crate::config::PidConfig;
use crate::controller::Controller;

#[derive(Debug, Clone)]
pub struct PidBalancer {
    pitch: PidController,
    roll: PidController,
    dt: f32,
}

impl PidBalancer {
    pub fn new(config: PidConfig) -> Self {
        let axis = || {
            PidController::new(config.gains.kp, config.gains.ki, config.gains.kd)
                .with_output_limit(config.max_angle)
        };
        Self {
            pitch: axis(),
            roll: axis(),
            dt: config.dt,
        }
    }
}

impl Controller for PidBalancer {
    fn name(&self) -> &str {
        "pid"
    }

    fn invoke(&mut self, state: &State) -> Action {
        if !state.ball_detected {
            self.pitch.reset();
            self.roll.reset();
            return Action::neutral();
        }
        Action::new(
            -self.pitch.update(state.y, self.dt),
            -self.roll.update(state.x, self.dt),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PidGains;
    use moab_hal::{EnvConfig, Environment, MoabEnv, PacingMode, SimHat, SimPlant};
    use moab_types::{Icon, Text};

    fn balancer(max_angle: f32) -> PidBalancer {
        PidBalancer::new(PidConfig {
            gains: PidGains::default(),
            max_angle,
            dt: 1.0 / 30.0,
        })
    }

    fn ball_at(x: f32, y: f32) -> State {
        State {
            ball_detected: true,
            x,
            y,
            ..State::default()
        }
    }

    #[test]
    fn tilts_toward_centre() {
        let mut c = balancer(16.0);
        let a = c.invoke(&ball_at(0.02, -0.01));
        // kp * offset on the first tick (no derivative history yet).
        assert!((a.roll - 1.5).abs() < 0.01, "roll = {}", a.roll);
        assert!((a.pitch + 0.75).abs() < 0.01, "pitch = {}", a.pitch);
    }

    #[test]
    fn output_respects_max_angle() {
        let mut c = balancer(5.0);
        let a = c.invoke(&ball_at(0.1, 0.1));
        assert!(a.pitch <= 5.0 && a.roll <= 5.0);
        assert!((a.pitch - 5.0).abs() < 1e-4);
    }

    #[test]
    fn lost_ball_gives_neutral_and_clears_history() {
        let mut c = balancer(16.0);
        c.invoke(&ball_at(0.05, 0.05));
        assert!(c.invoke(&State::default()).is_neutral());

        // After the reset the next tick has no derivative kick.
        let mut fresh = balancer(16.0);
        assert_eq!(c.invoke(&ball_at(0.01, 0.0)), fresh.invoke(&ball_at(0.01, 0.0)));
    }

    #[test]
    fn balances_a_simulated_ball() {
        let hat = SimHat::open().unwrap();
        let plant = SimPlant::builder().ball_position(0.04, -0.03).build();
        let mut env = MoabEnv::open(
            hat,
            Box::new(plant),
            EnvConfig {
                frequency: 30,
                debug: false,
                pacing: PacingMode::FreeRun,
            },
        )
        .unwrap();

        let mut c = balancer(16.0);
        let mut state = env.reset(Icon::Dot, Text::Classic).unwrap();
        for _ in 0..300 {
            let action = c.invoke(&state);
            state = env.step(action).unwrap();
        }
        assert!(state.ball_detected);
        assert!(
            state.x.hypot(state.y) < 0.005,
            "ball still at ({}, {})",
            state.x,
            state.y
        );
    }
}
