//! Single-axis PID (Proportional–Integral–Derivative) loop.
//!
//! Hardware-agnostic: the caller supplies the measured value and the
//! elapsed time and applies the returned output to whatever it drives.  The
//! plate balancer runs one instance per tilt axis, with the ball position as
//! measurement and a plate angle in degrees as output.
//!
//! # Example
//!
//! ```rust
//! use moab_hal::pid::PidController;
//!
//! // Ball 2 cm off centre, 30 Hz loop, ±16° plate.
//! let mut axis = PidController::new(75.0, 0.5, 45.0).with_output_limit(16.0);
//! let out = axis.update(0.02, 1.0 / 30.0);
//! assert!(out < 0.0); // drives the measurement back toward the set-point (0)
//! ```

/// A tunable PID loop with output clamping and integral anti-windup.
#[derive(Debug, Clone)]
pub struct PidController {
    kp: f32,
    ki: f32,
    kd: f32,
    integral: f32,
    last_error: Option<f32>,
    output_min: f32,
    output_max: f32,
}

impl PidController {
    /// New loop with unclamped output.  The set-point is fixed at 0, the
    /// plate centre.
    pub fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral: 0.0,
            last_error: None,
            output_min: f32::NEG_INFINITY,
            output_max: f32::INFINITY,
        }
    }

    /// Clamp output (and the integral contribution) to `[-limit, limit]`.
    pub fn with_output_limit(mut self, limit: f32) -> Self {
        let limit = limit.abs();
        self.set_output_limits(-limit, limit);
        self
    }

    /// Clamp output to `[min, max]`.  Integral wind-up is clamped to the
    /// same range.
    pub fn set_output_limits(&mut self, min: f32, max: f32) {
        self.output_min = min;
        self.output_max = max;
    }

    /// Accumulated ∫error·dt.
    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Compute the next output from `measurement` after `dt` seconds.
    ///
    /// A non-positive `dt` returns `0.0` and leaves the state untouched.
    pub fn update(&mut self, measurement: f32, dt: f32) -> f32 {
        if dt <= 0.0 {
            return 0.0;
        }

        let error = -measurement;
        let p = self.kp * error;

        self.integral += error * dt;
        let i = (self.ki * self.integral).clamp(self.output_min, self.output_max);
        // Back-calculate so the stored integral never exceeds what the
        // clamped term can express.
        if self.ki.abs() > f32::EPSILON {
            self.integral = i / self.ki;
        }

        let d = match self.last_error {
            Some(prev) => self.kd * (error - prev) / dt,
            None => 0.0,
        };
        self.last_error = Some(error);

        (p + i + d).clamp(self.output_min, self.output_max)
    }

    /// Forget the integral and derivative history.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 30.0;

    #[test]
    fn proportional_term_opposes_offset() {
        let mut axis = PidController::new(75.0, 0.0, 0.0);
        // error = 0 - 0.02 → output = 75 * -0.02 = -1.5
        let out = axis.update(0.02, DT);
        assert!((out + 1.5).abs() < 1e-4);
    }

    #[test]
    fn centred_ball_gives_zero_output() {
        let mut axis = PidController::new(75.0, 0.5, 45.0);
        assert!(axis.update(0.0, DT).abs() < 1e-6);
    }

    #[test]
    fn output_is_clamped_to_plate_limit() {
        let mut axis = PidController::new(1000.0, 0.0, 0.0).with_output_limit(16.0);
        assert!((axis.update(0.1, DT) + 16.0).abs() < 1e-4);
        assert!((axis.update(-0.1, DT) - 16.0).abs() < 1e-4);
    }

    #[test]
    fn derivative_matches_velocity_term() {
        let mut axis = PidController::new(0.0, 0.0, 45.0);
        axis.update(0.00, DT);
        // Ball moved 1 mm in one tick → velocity 0.03 m/s → d = -45 * 0.03.
        let out = axis.update(0.001, DT);
        assert!((out + 45.0 * 0.001 / DT).abs() < 1e-3);
    }

    #[test]
    fn integral_accumulates_error_times_dt() {
        let mut axis = PidController::new(0.0, 1.0, 0.0);
        axis.update(0.5, 0.5);
        let out = axis.update(0.5, 0.5);
        assert!((axis.integral() + 0.5).abs() < 1e-6);
        assert!((out + 0.5).abs() < 1e-6);
    }

    #[test]
    fn integral_wind_up_is_bounded_by_limits() {
        let mut axis = PidController::new(0.0, 10.0, 0.0).with_output_limit(1.0);
        for _ in 0..1000 {
            axis.update(1.0, DT);
        }
        assert!((axis.integral() + 0.1).abs() < 1e-4);
    }

    #[test]
    fn reset_behaves_like_fresh_loop() {
        let mut axis = PidController::new(75.0, 0.5, 45.0);
        axis.update(0.03, DT);
        axis.update(0.02, DT);
        axis.reset();

        let mut fresh = PidController::new(75.0, 0.5, 45.0);
        assert!((axis.update(0.01, DT) - fresh.update(0.01, DT)).abs() < 1e-6);
    }

    #[test]
    fn non_positive_dt_is_ignored() {
        let mut axis = PidController::new(1.0, 1.0, 1.0);
        assert_eq!(axis.update(0.5, 0.0), 0.0);
        assert_eq!(axis.update(0.5, -1.0), 0.0);
        assert_eq!(axis.integral(), 0.0);
    }
}
