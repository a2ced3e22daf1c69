//! Backoff policy applied between remote execution attempts.

use std::time::Duration;

/// Default first retry delay.
pub const DEFAULT_BASE: Duration = Duration::from_secs(1);

/// Default upper bound on any retry delay.
pub const DEFAULT_CAP: Duration = Duration::from_secs(10);

/// Default growth factor between successive delays.
pub const DEFAULT_MULTIPLIER: f64 = 1.5;

/// Pure exponential backoff schedule with an upper bound.
///
/// `delay(attempt)` is a function of its parameters only; the policy keeps no
/// state across attempts. Delays grow by the multiplier per attempt and are
/// clamped at the cap, so the schedule is monotonically non-decreasing until
/// the cap and constant afterwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    multiplier: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_BASE, DEFAULT_CAP, DEFAULT_MULTIPLIER)
    }
}

impl Backoff {
    /// Creates a policy from a base delay, a cap, and a growth multiplier.
    #[must_use]
    pub const fn new(base: Duration, cap: Duration, multiplier: f64) -> Self {
        Self {
            base,
            cap,
            multiplier,
        }
    }

    /// Returns the delay to wait before retry `attempt` (0-based).
    #[expect(
        clippy::float_arithmetic,
        reason = "the schedule is defined over a fractional multiplier; overflow degrades to the cap"
    )]
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.base.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(scaled).map_or(self.cap, |delay| delay.min(self.cap))
    }
}

#[cfg(test)]
mod tests;
