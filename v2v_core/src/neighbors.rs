//! Peer discovery capability consumed by the disseminators.
//!
//! The core never caches topology: every dissemination cycle asks the host
//! for the agents currently in range. The answer is a list of [`PeerHandle`]s,
//! each of which exposes exactly one capability on the remote store: upsert.

use crate::record::Position;
use crate::store::{LocalStore, UpsertOutcome};
use std::sync::Arc;
use std::time::Duration;
use v2v_env::{AgentId, SubjectId};

/// Proximity query supplied by the host environment.
///
/// Implementations must exclude `exclude` from the result and must release
/// any internal locks before returning, so callers can touch peer stores
/// without nesting locks.
pub trait NeighborFinder: Send + Sync {
    /// Returns every agent within `radius` of `position`, excluding `exclude`.
    fn query(&self, position: &Position, radius: f64, exclude: AgentId) -> Vec<PeerHandle>;
}

/// A reachable peer for the current cycle.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    id: AgentId,
    position: Position,
    broadcast_radius: f64,
    store: Arc<LocalStore>,
}

impl PeerHandle {
    /// Creates a handle.
    ///
    /// `broadcast_radius` is the peer's own radius, used when a flood
    /// continues outward from that peer.
    pub fn new(
        id: AgentId,
        position: Position,
        broadcast_radius: f64,
        store: Arc<LocalStore>,
    ) -> Self {
        Self {
            id,
            position,
            broadcast_radius,
            store,
        }
    }

    /// Peer's agent id.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Peer's position at query time.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Peer's own broadcast radius.
    pub fn broadcast_radius(&self) -> f64 {
        self.broadcast_radius
    }

    /// Write-only view of the peer's store.
    pub fn store(&self) -> PeerStore<'_> {
        PeerStore { inner: &self.store }
    }
}

/// The single capability a peer exposes to other agents.
pub struct PeerStore<'a> {
    inner: &'a LocalStore,
}

impl PeerStore<'_> {
    /// Merges a relayed report into the peer's store.
    pub fn upsert(
        &self,
        subject: SubjectId,
        position: Position,
        timestamp: Duration,
        observed_locally: bool,
    ) -> bool {
        self.inner
            .upsert(subject, position, timestamp, observed_locally)
    }

    pub(crate) fn merge(
        &self,
        subject: SubjectId,
        position: Position,
        timestamp: Duration,
        observed_locally: bool,
    ) -> UpsertOutcome {
        self.inner
            .merge(subject, position, timestamp, observed_locally)
    }
}

/// A finder that never returns peers. Useful for isolated agents.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNeighbors;

impl NeighborFinder for NoNeighbors {
    fn query(&self, _position: &Position, _radius: f64, _exclude: AgentId) -> Vec<PeerHandle> {
        Vec::new()
    }
}
