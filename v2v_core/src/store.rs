//! The per-agent detection store.
//!
//! Maps each subject to the freshest record this agent knows about. The
//! merge rule is newest-timestamp-wins: an incoming report with a timestamp
//! at or below the stored one is dropped, so older or duplicate relays can
//! never overwrite newer state. The first-hand flag is OR-ed on every
//! accepted merge and never cleared.
//!
//! # Locking
//!
//! Each store owns one exclusive lock. Every public operation holds it for a
//! single map operation and releases it before returning; no live reference
//! to the map ever escapes (see [`LocalStore::snapshot`]).

use crate::record::{DetectionRecord, Position};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::debug;
use v2v_env::{AgentId, SubjectId};

/// Result of merging one report into a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Subject was absent and has been inserted
    Inserted,

    /// Subject was present and the report was strictly newer
    Updated,

    /// Report was not newer than the stored record and was discarded
    Stale,
}

impl UpsertOutcome {
    /// Returns true if the store changed.
    pub fn changed(&self) -> bool {
        !matches!(self, UpsertOutcome::Stale)
    }
}

/// Detection store owned by exactly one agent.
#[derive(Debug)]
pub struct LocalStore {
    /// Owning agent (for logging)
    owner: AgentId,

    /// Subject -> latest accepted record
    records: Mutex<HashMap<SubjectId, DetectionRecord>>,
}

impl LocalStore {
    /// Creates an empty store for `owner`.
    pub fn new(owner: AgentId) -> Self {
        Self {
            owner,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the owning agent.
    pub fn owner(&self) -> AgentId {
        self.owner
    }

    /// Merges a report and returns whether the store changed.
    pub fn upsert(
        &self,
        subject: SubjectId,
        position: Position,
        timestamp: Duration,
        observed_locally: bool,
    ) -> bool {
        self.merge(subject, position, timestamp, observed_locally)
            .changed()
    }

    /// Merges a report and returns what happened.
    pub fn merge(
        &self,
        subject: SubjectId,
        position: Position,
        timestamp: Duration,
        observed_locally: bool,
    ) -> UpsertOutcome {
        let mut records = self.records.lock();

        let outcome = match records.get_mut(&subject) {
            None => {
                records.insert(
                    subject,
                    DetectionRecord::new(subject, position, timestamp, observed_locally),
                );
                UpsertOutcome::Inserted
            }
            Some(existing) if timestamp > existing.timestamp => {
                existing.position = position;
                existing.timestamp = timestamp;
                existing.observed_locally |= observed_locally;
                UpsertOutcome::Updated
            }
            Some(_) => UpsertOutcome::Stale,
        };
        drop(records);

        debug!(
            owner = %self.owner,
            %subject,
            t = timestamp.as_secs_f64(),
            local = observed_locally,
            ?outcome,
            "merge"
        );

        outcome
    }

    /// Removes every record older than `threshold` at `now`.
    ///
    /// Returns the removed subjects.
    pub fn expire(&self, now: Duration, threshold: Duration) -> HashSet<SubjectId> {
        let mut records = self.records.lock();

        let removed: HashSet<SubjectId> = records
            .values()
            .filter(|record| record.is_stale(now, threshold))
            .map(|record| record.subject)
            .collect();

        records.retain(|subject, _| !removed.contains(subject));

        removed
    }

    /// Returns a copy of every record.
    pub fn snapshot(&self) -> Vec<DetectionRecord> {
        self.records.lock().values().cloned().collect()
    }

    /// Returns a copy of one record.
    pub fn get(&self, subject: SubjectId) -> Option<DetectionRecord> {
        self.records.lock().get(&subject).cloned()
    }

    /// Number of tracked subjects.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// World-frame positions of every tracked subject.
    pub fn world_positions(&self) -> Vec<(SubjectId, Position)> {
        self.snapshot()
            .into_iter()
            .map(|record| (record.subject, record.position))
            .collect()
    }

    /// Positions of every tracked subject relative to `origin`.
    pub fn relative_positions(&self, origin: &Position) -> Vec<(SubjectId, Position)> {
        self.snapshot()
            .into_iter()
            .map(|record| (record.subject, record.relative_to(origin)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> LocalStore {
        LocalStore::new(AgentId::from_seed(0))
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_insert_then_duplicate_is_rejected() {
        let store = store();
        let w = SubjectId(7);
        let p = Position::new(5.0, 0.0, 0.0);

        assert!(store.upsert(w, p, secs(10.0), true));
        assert!(!store.upsert(w, p, secs(10.0), true));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_merge_outcomes() {
        let store = store();
        let w = SubjectId(7);

        assert_eq!(
            store.merge(w, Position::zeros(), secs(1.0), false),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            store.merge(w, Position::zeros(), secs(2.0), false),
            UpsertOutcome::Updated
        );
        assert_eq!(
            store.merge(w, Position::zeros(), secs(1.5), false),
            UpsertOutcome::Stale
        );
    }

    #[test]
    fn test_older_report_does_not_overwrite() {
        let store = store();
        let w = SubjectId(7);

        store.upsert(w, Position::new(5.0, 0.0, 0.0), secs(10.0), false);
        assert!(!store.upsert(w, Position::new(99.0, 0.0, 0.0), secs(9.0), false));

        let record = store.get(w).unwrap();
        assert_eq!(record.position, Position::new(5.0, 0.0, 0.0));
        assert_eq!(record.timestamp, secs(10.0));
    }

    #[test]
    fn test_sticky_flag_survives_relay() {
        let store = store();
        let w = SubjectId(7);

        store.upsert(w, Position::zeros(), secs(1.0), true);
        assert!(store.upsert(w, Position::new(1.0, 0.0, 0.0), secs(2.0), false));

        let record = store.get(w).unwrap();
        assert!(record.observed_locally);
        assert_eq!(record.position, Position::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_flag_set_by_later_first_hand_report() {
        let store = store();
        let w = SubjectId(7);

        store.upsert(w, Position::zeros(), secs(1.0), false);
        store.upsert(w, Position::zeros(), secs(2.0), true);

        assert!(store.get(w).unwrap().observed_locally);
    }

    #[test]
    fn test_expiry_boundary() {
        let store = store();
        let w = SubjectId(7);
        let threshold = Duration::from_secs(20);

        store.upsert(w, Position::zeros(), secs(10.0), true);

        assert!(store.expire(secs(29.9), threshold).is_empty());
        assert!(store.get(w).is_some());

        assert!(store.expire(secs(30.0), threshold).is_empty());

        let removed = store.expire(secs(30.001), threshold);
        assert!(removed.contains(&w));
        assert!(store.get(w).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_expire_only_removes_stale() {
        let store = store();
        let threshold = Duration::from_secs(20);

        store.upsert(SubjectId(1), Position::zeros(), secs(0.0), true);
        store.upsert(SubjectId(2), Position::zeros(), secs(15.0), false);

        let removed = store.expire(secs(25.0), threshold);

        assert_eq!(removed.len(), 1);
        assert!(removed.contains(&SubjectId(1)));
        assert!(store.get(SubjectId(2)).is_some());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = store();
        store.upsert(SubjectId(1), Position::zeros(), secs(1.0), true);

        let snapshot = store.snapshot();
        store.upsert(SubjectId(2), Position::zeros(), secs(1.0), true);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_projections() {
        let store = store();
        store.upsert(SubjectId(1), Position::new(10.0, 5.0, 0.0), secs(1.0), true);

        let world = store.world_positions();
        assert_eq!(world, vec![(SubjectId(1), Position::new(10.0, 5.0, 0.0))]);

        let relative = store.relative_positions(&Position::new(10.0, 0.0, 0.0));
        assert_eq!(relative, vec![(SubjectId(1), Position::new(0.0, 5.0, 0.0))]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn report() -> impl Strategy<Value = (u64, f64, u64, bool)> {
            (0u64..4, -100.0f64..100.0, 0u64..50_000, any::<bool>())
        }

        proptest! {
            #[test]
            fn prop_upsert_is_idempotent(
                subject in 0u64..8,
                x in -1000.0f64..1000.0,
                millis in 0u64..100_000,
                local in any::<bool>(),
            ) {
                let store = store();
                let w = SubjectId(subject);
                let p = Position::new(x, 0.0, 0.0);
                let t = Duration::from_millis(millis);

                prop_assert!(store.upsert(w, p, t, local));
                let before = store.get(w);
                prop_assert!(!store.upsert(w, p, t, local));
                prop_assert_eq!(store.get(w), before);
            }

            #[test]
            fn prop_timestamps_never_regress(reports in proptest::collection::vec(report(), 1..64)) {
                let store = store();
                let mut latest: HashMap<u64, Duration> = HashMap::new();

                for (subject, x, millis, local) in reports {
                    let w = SubjectId(subject);
                    let t = Duration::from_millis(millis);
                    let before = store.get(w);

                    let changed = store.upsert(w, Position::new(x, 0.0, 0.0), t, local);
                    let after = store.get(w).unwrap();

                    if let Some(prev) = before {
                        prop_assert!(after.timestamp >= prev.timestamp);
                        if t <= prev.timestamp {
                            prop_assert!(!changed);
                            prop_assert_eq!(after.position, prev.position);
                            prop_assert_eq!(after.timestamp, prev.timestamp);
                        }
                    }

                    let entry = latest.entry(subject).or_insert(t);
                    if t > *entry {
                        *entry = t;
                    }
                    prop_assert_eq!(after.timestamp, latest[&subject]);
                }
            }

            #[test]
            fn prop_first_hand_flag_is_sticky(reports in proptest::collection::vec(report(), 1..64)) {
                let store = store();
                let mut seen_local: HashSet<u64> = HashSet::new();

                for (subject, x, millis, local) in reports {
                    let w = SubjectId(subject);
                    let changed = store.upsert(w, Position::new(x, 0.0, 0.0), Duration::from_millis(millis), local);
                    if changed && local {
                        seen_local.insert(subject);
                    }

                    let record = store.get(w).unwrap();
                    prop_assert_eq!(record.observed_locally, seen_local.contains(&subject));
                }
            }
        }
    }
}
