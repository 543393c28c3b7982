//! Randomness seam
//!
//! Reply latency, reply selection and telemetry perturbation all draw from a
//! [`Chooser`]. Production code uses [`RandomChooser`]; tests plug in
//! [`FixedChooser`] so outcomes do not depend on a random source.

use core::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of every non-deterministic decision made by simulated components
pub trait Chooser: Send + 'static {
    /// Delay in `[min, max]`
    fn delay(&mut self, min: Duration, max: Duration) -> Duration;

    /// Index in `0..len`; `len` is never zero
    fn index(&mut self, len: usize) -> usize;

    /// Signed step in `-max..=max`
    fn delta(&mut self, max: i32) -> i32;
}

// ----------------------------------------------------------------------------
// Random Chooser
// ----------------------------------------------------------------------------

/// [`Chooser`] backed by a standard RNG
#[derive(Debug, Clone)]
pub struct RandomChooser {
    rng: StdRng,
}

impl RandomChooser {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded when a seed is configured, entropy otherwise
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_else(Self::from_entropy)
    }
}

impl Chooser for RandomChooser {
    fn delay(&mut self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    fn index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }

    fn delta(&mut self, max: i32) -> i32 {
        let max = max.saturating_abs();
        self.rng.gen_range(-max..=max)
    }
}

// ----------------------------------------------------------------------------
// Fixed Chooser
// ----------------------------------------------------------------------------

/// Deterministic [`Chooser`] returning preset answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedChooser {
    /// Delay to use; `None` picks the lower bound
    pub delay: Option<Duration>,
    /// Preferred index, clamped into range
    pub index: usize,
    /// Perturbation, clamped into range
    pub delta: i32,
}

impl Default for FixedChooser {
    fn default() -> Self {
        Self {
            delay: None,
            index: 0,
            delta: 1,
        }
    }
}

impl FixedChooser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn with_delta(mut self, delta: i32) -> Self {
        self.delta = delta;
        self
    }
}

impl Chooser for FixedChooser {
    fn delay(&mut self, min: Duration, max: Duration) -> Duration {
        self.delay.map_or(min, |d| d.clamp(min, max.max(min)))
    }

    fn index(&mut self, len: usize) -> usize {
        self.index.min(len.saturating_sub(1))
    }

    fn delta(&mut self, max: i32) -> i32 {
        let max = max.saturating_abs();
        self.delta.clamp(-max, max)
    }
}
