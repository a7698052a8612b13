//! Single-hop full sync on a fixed interval.
//!
//! Catches up agents that were out of range when a flood wave passed. The
//! whole store is offered to every current neighbor; receivers merge but do
//! not re-flood what they receive this way.

use crate::gossip::FloodSource;
use crate::neighbors::NeighborFinder;
use crate::store::LocalStore;
use std::sync::Arc;
use tracing::debug;

/// Counters for one push tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Neighbors in range this tick
    pub neighbors: usize,

    /// Records in the snapshot
    pub records: usize,

    /// Cross-agent upserts attempted (neighbors x records)
    pub offered: u64,

    /// Upserts that changed a neighbor's store
    pub accepted: u64,
}

/// Pushes a snapshot of one store to every neighbor in range.
#[derive(Clone)]
pub struct PeriodicPusher {
    store: Arc<LocalStore>,
    finder: Arc<dyn NeighborFinder>,
}

impl PeriodicPusher {
    /// Creates a pusher for `store`.
    pub fn new(store: Arc<LocalStore>, finder: Arc<dyn NeighborFinder>) -> Self {
        Self { store, finder }
    }

    /// Runs one push cycle from `source`.
    ///
    /// The snapshot is taken (and the local lock released) before any peer
    /// store is touched.
    pub fn tick(&self, source: FloodSource) -> PushReport {
        let neighbors = self
            .finder
            .query(&source.position, source.radius, source.id);
        if neighbors.is_empty() {
            return PushReport::default();
        }

        let snapshot = self.store.snapshot();
        let mut report = PushReport {
            neighbors: neighbors.len(),
            records: snapshot.len(),
            ..PushReport::default()
        };
        if snapshot.is_empty() {
            return report;
        }

        for peer in &neighbors {
            let remote = peer.store();
            for record in &snapshot {
                report.offered += 1;
                if remote.upsert(record.subject, record.position, record.timestamp, false) {
                    report.accepted += 1;
                }
            }
        }

        debug!(
            origin = %source.id,
            neighbors = report.neighbors,
            records = report.records,
            accepted = report.accepted,
            "full sync pushed"
        );

        report
    }
}
