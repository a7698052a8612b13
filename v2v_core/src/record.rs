//! The stored state for one subject in one agent's store.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use v2v_env::SubjectId;

/// World-frame position in length units.
pub type Position = Vector3<f64>;

/// Latest known state of a tracked subject, as held by one agent.
///
/// Every agent owns its own copy; records are never shared between stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Observed entity
    pub subject: SubjectId,

    /// World-frame position at `timestamp`
    pub position: Position,

    /// Simulation time of the observation that produced this value
    pub timestamp: Duration,

    /// True once this agent itself has observed the subject (sticky)
    pub observed_locally: bool,
}

impl DetectionRecord {
    /// Creates a record.
    pub fn new(
        subject: SubjectId,
        position: Position,
        timestamp: Duration,
        observed_locally: bool,
    ) -> Self {
        Self {
            subject,
            position,
            timestamp,
            observed_locally,
        }
    }

    /// Age of the record at `now`. Zero if the record is from the future.
    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.timestamp)
    }

    /// Returns true if the record is older than `threshold` at `now`.
    pub fn is_stale(&self, now: Duration, threshold: Duration) -> bool {
        self.age(now) > threshold
    }

    /// Position relative to `origin`.
    pub fn relative_to(&self, origin: &Position) -> Position {
        self.position - *origin
    }
}
