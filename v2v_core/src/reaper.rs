//! Eviction of records that aged past the staleness threshold.

use crate::store::LocalStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use v2v_env::SubjectId;

/// Expires stale records on one store. Run once per cycle, before either
/// disseminator reads the store.
#[derive(Debug, Clone)]
pub struct Reaper {
    store: Arc<LocalStore>,
    threshold: Duration,
}

impl Reaper {
    /// Creates a reaper for `store` with the given staleness threshold.
    pub fn new(store: Arc<LocalStore>, threshold: Duration) -> Self {
        Self { store, threshold }
    }

    /// Removes every record older than the threshold at `now`.
    pub fn run(&self, now: Duration) -> HashSet<SubjectId> {
        let removed = self.store.expire(now, self.threshold);
        if !removed.is_empty() {
            debug!(
                owner = %self.store.owner(),
                count = removed.len(),
                t = now.as_secs_f64(),
                "expired stale records"
            );
        }
        removed
    }

    /// Age beyond which a record is evicted.
    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}
