//! Fixed-period scheduling gate.
//!
//! Replaces an engine-owned looping timer: the host polls the gate from its
//! own frame loop and runs the periodic callback whenever a tick is due.

use crate::error::EnvError;
use std::time::Duration;

/// A looping timer driven by an external clock.
///
/// The first tick is due one full `interval` after the start time, matching
/// a looping engine timer armed at spawn. If the host falls behind by several
/// periods, a single `poll` fires once and re-arms on the next period
/// boundary after `now`; missed ticks are not replayed.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    interval: Duration,
    next_due: Duration,
    fired: u64,
}

impl IntervalTimer {
    /// Creates a timer whose clock starts at zero.
    pub fn new(interval: Duration) -> Result<Self, EnvError> {
        Self::starting_at(interval, Duration::ZERO)
    }

    /// Creates a timer armed at `start`.
    pub fn starting_at(interval: Duration, start: Duration) -> Result<Self, EnvError> {
        if interval.is_zero() {
            return Err(EnvError::invalid_interval("period must be greater than zero"));
        }

        Ok(Self {
            interval,
            next_due: start + interval,
            fired: 0,
        })
    }

    /// Returns true if a tick is due at `now`, and re-arms the timer.
    pub fn poll(&mut self, now: Duration) -> bool {
        if now < self.next_due {
            return false;
        }

        while self.next_due <= now {
            self.next_due += self.interval;
        }
        self.fired += 1;
        true
    }

    /// Returns the configured period.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the time at which the next tick becomes due.
    pub fn next_due(&self) -> Duration {
        self.next_due
    }

    /// Returns how many ticks have fired so far.
    pub fn fired(&self) -> u64 {
        self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_interval_rejected() {
        assert!(IntervalTimer::new(Duration::ZERO).is_err());
    }

    #[test]
    fn test_first_tick_after_one_period() {
        let mut timer = IntervalTimer::new(Duration::from_secs(1)).unwrap();

        assert!(!timer.poll(Duration::from_millis(999)));
        assert!(timer.poll(Duration::from_secs(1)));
        assert!(!timer.poll(Duration::from_millis(1500)));
        assert!(timer.poll(Duration::from_secs(2)));
        assert_eq!(timer.fired(), 2);
    }

    #[test]
    fn test_missed_ticks_fire_once() {
        let mut timer = IntervalTimer::new(Duration::from_secs(1)).unwrap();

        assert!(timer.poll(Duration::from_millis(3500)));
        assert_eq!(timer.next_due(), Duration::from_secs(4));
        assert!(!timer.poll(Duration::from_millis(3900)));
        assert_eq!(timer.fired(), 1);
    }

    #[test]
    fn test_starting_at_offsets_schedule() {
        let mut timer =
            IntervalTimer::starting_at(Duration::from_secs(1), Duration::from_secs(10)).unwrap();

        assert!(!timer.poll(Duration::from_millis(10_500)));
        assert!(timer.poll(Duration::from_secs(11)));
    }
}
