//! Inclusive duration ranges sampled for patience and think times.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Inclusive range of durations with millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    /// Lower bound in milliseconds.
    pub min_ms: u64,
    /// Upper bound in milliseconds.
    pub max_ms: u64,
}

impl DurationRange {
    /// Build a range, swapping the bounds if given in reverse.
    #[must_use]
    pub const fn from_millis(a: u64, b: u64) -> Self {
        if a <= b {
            Self { min_ms: a, max_ms: b }
        } else {
            Self { min_ms: b, max_ms: a }
        }
    }

    /// Lower bound.
    #[must_use]
    pub const fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    /// Upper bound.
    #[must_use]
    pub const fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    /// Draw a uniformly distributed duration from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min_ms >= self.max_ms {
            return self.min();
        }
        Duration::from_millis(rng.random_range(self.min_ms..=self.max_ms))
    }
}

/// Milliseconds in `d`, saturating at `u64::MAX`.
#[must_use]
pub fn duration_to_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
