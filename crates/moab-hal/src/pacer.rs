//! [`Pacer`] – wall-clock frequency discipline for the control loop.
//!
//! The environment calls [`Pacer::wait`] once per step.  Deadlines advance by
//! exactly one period from the previous deadline rather than from "now", so
//! time spent in I/O and decision-making is absorbed by sleeping less, and
//! sleep overshoot does not accumulate into drift.
//!
//! A step that finishes more than a whole period late counts as an overrun:
//! the schedule is re-anchored to the current instant instead of bursting
//! through the missed ticks.

use std::time::{Duration, Instant};

use moab_types::MoabError;
use tracing::warn;

/// Whether the pacer actually sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacingMode {
    /// Sleep until each deadline.
    #[default]
    RealTime,
    /// Never sleep; used for simulation and tests.
    FreeRun,
}

/// Cycle-timing counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PacerStats {
    /// Number of completed waits.
    pub ticks: u64,
    /// Number of times the schedule had to be re-anchored.
    pub overruns: u64,
    intervals: u64,
    total_interval: Duration,
}

impl PacerStats {
    /// Mean wall-clock time between consecutive waits, if at least two have
    /// completed.
    pub fn mean_period(&self) -> Option<Duration> {
        if self.intervals == 0 {
            return None;
        }
        u32::try_from(self.intervals)
            .ok()
            .map(|n| self.total_interval / n)
    }
}

/// Control period for `frequency` Hz.
///
/// # Errors
///
/// Returns [`MoabError::InvalidConfig`] when `frequency` is zero or so high
/// that the period rounds down to zero nanoseconds.
pub fn period_for(frequency: u32) -> Result<Duration, MoabError> {
    if frequency == 0 {
        return Err(MoabError::InvalidConfig(
            "frequency must be a positive number of Hz".to_string(),
        ));
    }
    let period = Duration::from_secs(1) / frequency;
    if period.is_zero() {
        return Err(MoabError::InvalidConfig(format!(
            "frequency {frequency} Hz is too high: the control period rounds to zero"
        )));
    }
    Ok(period)
}

/// Deadline-based sleeper for a fixed control frequency.
#[derive(Debug)]
pub struct Pacer {
    period: Duration,
    mode: PacingMode,
    next_deadline: Option<Instant>,
    last_tick: Option<Instant>,
    stats: PacerStats,
}

impl Pacer {
    /// Create a pacer for `frequency` Hz.
    ///
    /// # Errors
    ///
    /// See [`period_for`].
    pub fn new(frequency: u32, mode: PacingMode) -> Result<Self, MoabError> {
        Ok(Self {
            period: period_for(frequency)?,
            mode,
            next_deadline: None,
            last_tick: None,
            stats: PacerStats::default(),
        })
    }

    /// Nominal cycle time, `1 / frequency`.
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stats(&self) -> PacerStats {
        self.stats
    }

    /// Start a fresh schedule one period from now.  Counters are kept.
    pub fn restart(&mut self) {
        self.next_deadline = Some(Instant::now() + self.period);
        self.last_tick = None;
    }

    /// Block until the current deadline and schedule the next one.
    ///
    /// Returns how long the call slept.
    pub fn wait(&mut self) -> Duration {
        let slept = match self.mode {
            PacingMode::FreeRun => Duration::ZERO,
            PacingMode::RealTime => self.sleep_until_deadline(),
        };

        let now = Instant::now();
        if let Some(last) = self.last_tick {
            self.stats.intervals += 1;
            self.stats.total_interval += now - last;
        }
        self.last_tick = Some(now);
        self.stats.ticks += 1;
        slept
    }

    fn sleep_until_deadline(&mut self) -> Duration {
        let now = Instant::now();
        let deadline = *self.next_deadline.get_or_insert(now + self.period);

        if now < deadline {
            let slept = deadline - now;
            std::thread::sleep(slept);
            self.next_deadline = Some(deadline + self.period);
            return slept;
        }

        let late = now - deadline;
        if late > self.period {
            self.stats.overruns += 1;
            warn!(
                late_ms = late.as_secs_f64() * 1e3,
                period_ms = self.period.as_secs_f64() * 1e3,
                "control cycle overran; re-anchoring schedule"
            );
            self.next_deadline = Some(now + self.period);
        } else {
            self.next_deadline = Some(deadline + self.period);
        }
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_frequency_is_rejected() {
        assert!(matches!(
            Pacer::new(0, PacingMode::RealTime),
            Err(MoabError::InvalidConfig(_))
        ));
    }

    #[test]
    fn frequency_with_zero_period_is_rejected() {
        assert!(matches!(
            Pacer::new(2_000_000_000, PacingMode::FreeRun),
            Err(MoabError::InvalidConfig(_))
        ));
        // One nanosecond per tick is still a period.
        assert_eq!(
            period_for(1_000_000_000).unwrap(),
            Duration::from_nanos(1)
        );
    }

    #[test]
    fn period_is_inverse_of_frequency() {
        let pacer = Pacer::new(50, PacingMode::RealTime).unwrap();
        assert_eq!(pacer.period(), Duration::from_millis(20));
    }

    #[test]
    fn free_run_never_sleeps() {
        let mut pacer = Pacer::new(1, PacingMode::FreeRun).unwrap();
        pacer.restart();
        let start = Instant::now();
        for _ in 0..10 {
            assert_eq!(pacer.wait(), Duration::ZERO);
        }
        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(pacer.stats().ticks, 10);
        assert_eq!(pacer.stats().overruns, 0);
    }

    #[test]
    fn mean_period_needs_two_ticks() {
        let mut pacer = Pacer::new(1000, PacingMode::FreeRun).unwrap();
        assert_eq!(pacer.stats().mean_period(), None);
        pacer.wait();
        assert_eq!(pacer.stats().mean_period(), None);
        pacer.wait();
        assert!(pacer.stats().mean_period().is_some());
    }

    #[test]
    fn real_time_mean_period_tracks_frequency() {
        let frequency = 100;
        let mut pacer = Pacer::new(frequency, PacingMode::RealTime).unwrap();
        pacer.restart();
        for _ in 0..100 {
            // Simulated per-cycle work well under the period.
            std::thread::sleep(Duration::from_millis(2));
            pacer.wait();
        }
        let mean = pacer.stats().mean_period().unwrap().as_secs_f64();
        let expected = 1.0 / f64::from(frequency);
        assert!(
            (mean - expected).abs() <= expected * 0.10,
            "mean period {mean:.5}s not within 10% of {expected:.5}s"
        );
    }

    #[test]
    fn work_longer_than_period_counts_overrun() {
        let mut pacer = Pacer::new(200, PacingMode::RealTime).unwrap();
        pacer.restart();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(pacer.wait(), Duration::ZERO);
        assert_eq!(pacer.stats().overruns, 1);

        // Re-anchored: the next wait sleeps again instead of bursting.
        assert!(pacer.wait() > Duration::ZERO);
    }
}
