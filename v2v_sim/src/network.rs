//! Simulated radio range with fault injection.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use v2v_core::{AgentId, NeighborFinder, PeerHandle, Position};

/// Link controller for fault injection.
#[derive(Debug, Default)]
pub struct LinkController {
    /// Active partitions (groups that cannot reach each other)
    partitions: Mutex<Vec<(Vec<AgentId>, Vec<AgentId>)>>,
}

impl LinkController {
    /// Creates a new link controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a partition between two groups.
    pub fn partition(&self, group_a: Vec<AgentId>, group_b: Vec<AgentId>) {
        self.partitions.lock().push((group_a, group_b));
    }

    /// Heals all active partitions.
    pub fn heal_all(&self) {
        self.partitions.lock().clear();
    }

    /// Returns true if any partition is active.
    pub fn is_partitioned(&self) -> bool {
        !self.partitions.lock().is_empty()
    }

    /// Checks if two agents can communicate (not partitioned).
    pub fn can_communicate(&self, from: AgentId, to: AgentId) -> bool {
        let partitions = self.partitions.lock();

        !partitions.iter().any(|(group_a, group_b)| {
            let from_in_a = group_a.contains(&from);
            let from_in_b = group_b.contains(&from);
            let to_in_a = group_a.contains(&to);
            let to_in_b = group_b.contains(&to);

            (from_in_a && to_in_b) || (from_in_b && to_in_a)
        })
    }
}

/// Radius-based neighbor finder over the latest vehicle positions.
///
/// The host refreshes the index after moving vehicles; queries between two
/// refreshes see the same snapshot.
pub struct ProximityIndex {
    entries: RwLock<Vec<PeerHandle>>,
    links: Arc<LinkController>,
    queries: AtomicU64,
}

impl ProximityIndex {
    /// Creates an empty index gated by `links`.
    pub fn new(links: Arc<LinkController>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            links,
            queries: AtomicU64::new(0),
        }
    }

    /// Replaces the indexed handles.
    pub fn refresh(&self, handles: Vec<PeerHandle>) {
        *self.entries.write() = handles;
    }

    /// Number of indexed agents.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no agent is indexed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total queries served.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    /// Link controller consulted on every query.
    pub fn links(&self) -> &Arc<LinkController> {
        &self.links
    }
}

impl NeighborFinder for ProximityIndex {
    fn query(&self, position: &Position, radius: f64, exclude: AgentId) -> Vec<PeerHandle> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        let entries = self.entries.read();
        entries
            .iter()
            .filter(|peer| peer.id() != exclude)
            .filter(|peer| (peer.position() - position).norm() <= radius)
            .filter(|peer| self.links.can_communicate(exclude, peer.id()))
            .cloned()
            .collect()
    }
}
