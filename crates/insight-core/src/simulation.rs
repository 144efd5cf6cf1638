//! Drift-and-noise reading generator used in simulation mode.
//!
//! Each channel follows a [`DriftModel`]: below its soft bound the value
//! relaxes downward, above it the value runs away upward, and uniform noise
//! with a small bias is added on every step. The result is clamped to the
//! channel's hard range, so a device left alone drifts into the warning and
//! critical tiers over time.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use insight_types::{Channel, Reading};

/// Per-channel drift parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftModel {
    /// Above this value the channel drifts upward.
    pub soft_bound: f64,
    /// Step applied at or below the soft bound.
    pub relax: f64,
    /// Step applied above the soft bound.
    pub runaway: f64,
    /// Width of the noise term.
    pub noise_span: f64,
    /// Subtracted from the uniform sample before scaling.
    pub noise_bias: f64,
}

impl DriftModel {
    /// Default temperature model.
    pub const TEMPERATURE: Self = Self {
        soft_bound: 70.0,
        relax: -0.2,
        runaway: 0.5,
        noise_span: 1.5,
        noise_bias: 0.45,
    };

    /// Default pressure model.
    pub const PRESSURE: Self = Self {
        soft_bound: 160.0,
        relax: -0.5,
        runaway: 1.0,
        noise_span: 4.0,
        noise_bias: 0.5,
    };

    /// Default vibration model.
    pub const VIBRATION: Self = Self {
        soft_bound: 3.0,
        relax: -0.05,
        runaway: 0.1,
        noise_span: 0.15,
        noise_bias: 0.48,
    };

    /// Next unclamped value given the current one and a uniform sample `r` in `[0, 1)`.
    pub fn step(&self, current: f64, r: f64) -> f64 {
        let drift = if current > self.soft_bound {
            self.runaway
        } else {
            self.relax
        };
        current + drift + (r - self.noise_bias) * self.noise_span
    }
}

/// Drift models for all three channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationProfile {
    /// Temperature drift.
    pub temperature: DriftModel,
    /// Pressure drift.
    pub pressure: DriftModel,
    /// Vibration drift.
    pub vibration: DriftModel,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            temperature: DriftModel::TEMPERATURE,
            pressure: DriftModel::PRESSURE,
            vibration: DriftModel::VIBRATION,
        }
    }
}

impl SimulationProfile {
    /// Model for one channel.
    pub fn model(&self, channel: Channel) -> &DriftModel {
        match channel {
            Channel::Temperature => &self.temperature,
            Channel::Pressure => &self.pressure,
            Channel::Vibration => &self.vibration,
        }
    }
}

/// Generates simulated readings.
///
/// Generic over the random source so tests can use a seeded generator.
///
/// ```
/// use insight_core::Simulator;
/// use insight_types::Reading;
///
/// let mut sim = Simulator::seeded(7);
/// let start = Reading::now(95.0, 240.0, 9.5);
/// let next = sim.next_reading(&start);
/// assert!(next.is_within_ranges());
/// assert!(next.temperature >= 95.0 - 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Simulator<R = StdRng> {
    profile: SimulationProfile,
    rng: R,
}

impl Simulator<StdRng> {
    /// Create a simulator seeded from the operating system.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Create a deterministic simulator.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for Simulator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Simulator<R> {
    /// Create a simulator over an arbitrary random source.
    pub fn with_rng(rng: R) -> Self {
        Self {
            profile: SimulationProfile::default(),
            rng,
        }
    }

    /// Replace the drift profile.
    #[must_use]
    pub fn with_profile(mut self, profile: SimulationProfile) -> Self {
        self.profile = profile;
        self
    }

    /// The active drift profile.
    pub fn profile(&self) -> &SimulationProfile {
        &self.profile
    }

    /// Produce the next reading from the current one, stamped now.
    pub fn next_reading(&mut self, current: &Reading) -> Reading {
        self.next_reading_at(current, OffsetDateTime::now_utc())
    }

    /// Produce the next reading from the current one with an explicit timestamp.
    pub fn next_reading_at(&mut self, current: &Reading, time: OffsetDateTime) -> Reading {
        let temperature = self.step(Channel::Temperature, current.temperature);
        let pressure = self.step(Channel::Pressure, current.pressure);
        let vibration = self.step(Channel::Vibration, current.vibration);
        Reading::clamped(time, temperature, pressure, vibration)
    }

    /// Initial reading for a newly added device: 50±5 °C, 120±10 PSI, 1.5±0.25 G.
    pub fn initial_reading(&mut self) -> Reading {
        let temperature = 50.0 + (self.rng.random::<f64>() - 0.5) * 10.0;
        let pressure = 120.0 + (self.rng.random::<f64>() - 0.5) * 20.0;
        let vibration = 1.5 + (self.rng.random::<f64>() - 0.5) * 0.5;
        Reading::now(temperature, pressure, vibration)
    }

    /// Uniform index in `0..len`, or `None` when `len` is zero.
    pub fn pick(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng.random_range(0..len))
    }

    fn step(&mut self, channel: Channel, current: f64) -> f64 {
        let r = self.rng.random::<f64>();
        self.profile.model(channel).step(current, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_relaxes_below_soft_bound() {
        let model = DriftModel::TEMPERATURE;
        // r == bias cancels the noise term.
        assert!((model.step(60.0, 0.45) - 59.8).abs() < 1e-9);
    }

    #[test]
    fn test_step_runs_away_above_soft_bound() {
        let model = DriftModel::PRESSURE;
        assert!((model.step(170.0, 0.5) - 171.0).abs() < 1e-9);
    }

    #[test]
    fn test_soft_bound_itself_relaxes() {
        let model = DriftModel::VIBRATION;
        assert!((model.step(3.0, 0.48) - 2.95).abs() < 1e-9);
    }

    #[test]
    fn test_noise_extremes() {
        let model = DriftModel::TEMPERATURE;
        let low = model.step(60.0, 0.0);
        let high = model.step(60.0, 0.999_999);
        assert!((low - (60.0 - 0.2 - 0.675)).abs() < 1e-9);
        assert!(high < 60.0 - 0.2 + 0.825 + 1e-6);
    }

    #[test]
    fn test_next_reading_clamped_at_ceiling() {
        let mut sim = Simulator::seeded(1);
        let mut reading = Reading::clamped(OffsetDateTime::UNIX_EPOCH, 100.0, 250.0, 10.0);
        for _ in 0..20 {
            reading = sim.next_reading_at(&reading, OffsetDateTime::UNIX_EPOCH);
            assert!(reading.is_within_ranges());
        }
        // Runaway dominates the noise above the soft bound.
        assert!(reading.temperature > 95.0);
    }

    #[test]
    fn test_seeded_simulators_agree() {
        let start = Reading::clamped(OffsetDateTime::UNIX_EPOCH, 55.0, 105.0, 1.2);
        let mut a = Simulator::seeded(42);
        let mut b = Simulator::seeded(42);
        for _ in 0..10 {
            assert_eq!(
                a.next_reading_at(&start, OffsetDateTime::UNIX_EPOCH),
                b.next_reading_at(&start, OffsetDateTime::UNIX_EPOCH)
            );
        }
    }

    #[test]
    fn test_pick() {
        let mut a = Simulator::seeded(5);
        let mut b = Simulator::seeded(5);
        assert_eq!(a.pick(0), None);
        for _ in 0..50 {
            let index = a.pick(5);
            assert_eq!(index, b.pick(5));
            assert!(index.is_some_and(|i| i < 5));
        }
    }

    #[test]
    fn test_initial_reading_bounds() {
        let mut sim = Simulator::seeded(9);
        for _ in 0..200 {
            let r = sim.initial_reading();
            assert!((45.0..=55.0).contains(&r.temperature));
            assert!((110.0..=130.0).contains(&r.pressure));
            assert!((1.25..=1.75).contains(&r.vibration));
        }
    }
}
