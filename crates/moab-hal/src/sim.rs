//! In-process ball-on-plate simulation for running the controller without
//! hardware.
//!
//! [`SimPlant`] models a hollow ball (a ping-pong ball) rolling on a tilting
//! circular plate.  Rolling without slipping gives an acceleration of
//! `3/5 · g · sin θ` along each tilted axis.  Once the ball leaves the plate
//! it is no longer detected until the next [`Plant::activate`].
//!
//! Sensor noise comes from a seeded [`StdRng`] that is re-seeded on every
//! activation, so two plants built with the same seed produce identical
//! readings for identical command sequences.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use moab_hal::plant::Plant;
//! use moab_hal::sim::SimPlant;
//! use moab_types::Action;
//!
//! let mut plant = SimPlant::builder().ball_position(0.02, 0.0).seed(7).build();
//! plant.activate().unwrap();
//! plant.apply(Action::new(0.0, 5.0)).unwrap(); // raise the +x edge
//! plant.advance(Duration::from_millis(100));
//! let reading = plant.sense().unwrap();
//! assert!(reading.x < 0.02);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use moab_types::{Action, MoabError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::plant::{BallReading, Plant};

/// Radius of the Moab plate in metres.
pub const PLATE_RADIUS_M: f32 = 0.1125;

const GRAVITY: f32 = 9.81;
/// Rolling hollow sphere: a = g·sinθ / (1 + 2/3).
const ROLLING_FACTOR: f32 = 3.0 / 5.0;

// ─────────────────────────────────────────────────────────────────────────────
// Probe
// ─────────────────────────────────────────────────────────────────────────────

/// Counters that stay observable after the plant has been moved into an
/// environment.
#[derive(Debug, Clone, Default)]
pub struct SimProbe {
    activations: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
    senses: Arc<AtomicUsize>,
}

impl SimProbe {
    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn senses(&self) -> usize {
        self.senses.load(Ordering::SeqCst)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SimPlant
// ─────────────────────────────────────────────────────────────────────────────

/// Simulated plate and ball.  Construct with [`SimPlant::builder`].
#[derive(Debug)]
pub struct SimPlant {
    seed: u64,
    start: (f32, f32),
    start_velocity: (f32, f32),
    sensor_noise: f32,
    fail_after: Option<usize>,

    rng: StdRng,
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    pitch_deg: f32,
    roll_deg: f32,
    on_plate: bool,
    powered: bool,
    probe: SimProbe,
}

impl SimPlant {
    pub fn builder() -> SimPlantBuilder {
        SimPlantBuilder::default()
    }

    /// Handle onto this plant's lifecycle counters.
    pub fn probe(&self) -> SimProbe {
        self.probe.clone()
    }

    /// `true` while the servos are powered.
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    fn place_ball(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        (self.x, self.y) = self.start;
        (self.vx, self.vy) = self.start_velocity;
        self.pitch_deg = 0.0;
        self.roll_deg = 0.0;
        self.on_plate = self.x.hypot(self.y) <= PLATE_RADIUS_M;
    }

    fn noise(&mut self) -> f32 {
        if self.sensor_noise > 0.0 {
            self.rng.gen_range(-self.sensor_noise..=self.sensor_noise)
        } else {
            0.0
        }
    }

    fn fault(&self, details: impl Into<String>) -> MoabError {
        MoabError::HardwareIo {
            component: self.id().to_string(),
            details: details.into(),
        }
    }
}

impl Plant for SimPlant {
    fn id(&self) -> &str {
        "sim_plate"
    }

    fn activate(&mut self) -> Result<(), MoabError> {
        self.place_ball();
        self.powered = true;
        self.probe.activations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn apply(&mut self, action: Action) -> Result<(), MoabError> {
        if !self.powered {
            return Err(self.fault("servos are not powered"));
        }
        self.pitch_deg = action.pitch;
        self.roll_deg = action.roll;
        Ok(())
    }

    fn advance(&mut self, dt: Duration) {
        if !self.on_plate {
            return;
        }
        let dt = dt.as_secs_f32();
        let k = ROLLING_FACTOR * GRAVITY;
        let ax = -k * self.roll_deg.to_radians().sin();
        let ay = -k * self.pitch_deg.to_radians().sin();
        // Semi-implicit Euler: velocity first, then position.
        self.vx += ax * dt;
        self.vy += ay * dt;
        self.x += self.vx * dt;
        self.y += self.vy * dt;
        if self.x.hypot(self.y) > PLATE_RADIUS_M {
            self.on_plate = false;
        }
    }

    fn sense(&mut self) -> Result<BallReading, MoabError> {
        let count = self.probe.senses.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after
            && count >= limit
        {
            return Err(self.fault(format!("sensor stopped responding after {limit} frames")));
        }
        if !self.on_plate {
            return Ok(BallReading::lost());
        }
        let nx = self.noise();
        let ny = self.noise();
        Ok(BallReading {
            detected: true,
            x: self.x + nx,
            y: self.y + ny,
        })
    }

    fn shutdown(&mut self) -> Result<(), MoabError> {
        self.pitch_deg = 0.0;
        self.roll_deg = 0.0;
        self.powered = false;
        self.probe.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`SimPlant`].  Defaults: ball at rest at the centre, no
/// sensor noise, seed 0, never faults.
#[derive(Debug, Default)]
pub struct SimPlantBuilder {
    seed: u64,
    start: (f32, f32),
    start_velocity: (f32, f32),
    sensor_noise: f32,
    fail_after: Option<usize>,
}

impl SimPlantBuilder {
    /// Seed for the sensor-noise generator.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Initial ball position in metres.
    pub fn ball_position(mut self, x: f32, y: f32) -> Self {
        self.start = (x, y);
        self
    }

    /// Initial ball velocity in metres per second.
    pub fn ball_velocity(mut self, vx: f32, vy: f32) -> Self {
        self.start_velocity = (vx, vy);
        self
    }

    /// Uniform sensor noise amplitude in metres.
    pub fn sensor_noise(mut self, amplitude: f32) -> Self {
        self.sensor_noise = amplitude.abs();
        self
    }

    /// Fail every `sense` call after the first `frames` succeed.
    pub fn fail_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    pub fn build(self) -> SimPlant {
        let mut plant = SimPlant {
            seed: self.seed,
            start: self.start,
            start_velocity: self.start_velocity,
            sensor_noise: self.sensor_noise,
            fail_after: self.fail_after,
            rng: StdRng::seed_from_u64(self.seed),
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            pitch_deg: 0.0,
            roll_deg: 0.0,
            on_plate: true,
            powered: false,
            probe: SimProbe::default(),
        };
        plant.place_ball();
        plant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: Duration = Duration::from_millis(33);

    fn run(plant: &mut SimPlant, action: Action, steps: usize) -> Vec<BallReading> {
        plant.activate().unwrap();
        (0..steps)
            .map(|_| {
                plant.apply(action).unwrap();
                plant.advance(DT);
                plant.sense().unwrap()
            })
            .collect()
    }

    #[test]
    fn level_plate_keeps_ball_at_rest() {
        let mut plant = SimPlant::builder().ball_position(0.01, -0.02).build();
        let readings = run(&mut plant, Action::neutral(), 50);
        let last = readings.last().unwrap();
        assert!(last.detected);
        assert!((last.x - 0.01).abs() < 1e-6);
        assert!((last.y + 0.02).abs() < 1e-6);
    }

    #[test]
    fn positive_roll_pushes_ball_toward_negative_x() {
        let mut plant = SimPlant::builder().build();
        let readings = run(&mut plant, Action::new(0.0, 3.0), 10);
        assert!(readings.last().unwrap().x < 0.0);
        assert!(readings.last().unwrap().y.abs() < 1e-6);
    }

    #[test]
    fn positive_pitch_pushes_ball_toward_negative_y() {
        let mut plant = SimPlant::builder().build();
        let readings = run(&mut plant, Action::new(3.0, 0.0), 10);
        assert!(readings.last().unwrap().y < 0.0);
    }

    #[test]
    fn ball_is_lost_after_rolling_off_the_plate() {
        let mut plant = SimPlant::builder().ball_velocity(1.0, 0.0).build();
        let readings = run(&mut plant, Action::neutral(), 10);
        assert!(!readings.last().unwrap().detected);

        // Re-activation puts the ball back.
        plant.activate().unwrap();
        assert!(plant.sense().unwrap().detected);
    }

    #[test]
    fn same_seed_gives_identical_noisy_readings() {
        let build = || {
            SimPlant::builder()
                .ball_position(0.02, 0.01)
                .sensor_noise(0.001)
                .seed(42)
                .build()
        };
        let a = run(&mut build(), Action::new(1.0, -1.0), 30);
        let b = run(&mut build(), Action::new(1.0, -1.0), 30);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_give_different_noise() {
        let mut a = SimPlant::builder().sensor_noise(0.001).seed(1).build();
        let mut b = SimPlant::builder().sensor_noise(0.001).seed(2).build();
        assert_ne!(
            run(&mut a, Action::neutral(), 5),
            run(&mut b, Action::neutral(), 5)
        );
    }

    #[test]
    fn apply_before_activate_is_a_fault() {
        let mut plant = SimPlant::builder().build();
        assert!(matches!(
            plant.apply(Action::neutral()),
            Err(MoabError::HardwareIo { .. })
        ));
    }

    #[test]
    fn fail_after_injects_sensor_fault() {
        let mut plant = SimPlant::builder().fail_after(2).build();
        plant.activate().unwrap();
        assert!(plant.sense().is_ok());
        assert!(plant.sense().is_ok());
        assert!(matches!(plant.sense(), Err(MoabError::HardwareIo { .. })));
    }

    #[test]
    fn probe_counts_lifecycle_calls() {
        let mut plant = SimPlant::builder().build();
        let probe = plant.probe();
        plant.activate().unwrap();
        plant.sense().unwrap();
        plant.shutdown().unwrap();
        assert_eq!(probe.activations(), 1);
        assert_eq!(probe.senses(), 1);
        assert_eq!(probe.shutdowns(), 1);
        assert!(!plant.is_powered());
    }
}
