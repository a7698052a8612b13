//! Bounded multi-hop flood of a single record.
//!
//! A wave starts at the agent whose store just accepted a record and spreads
//! breadth-first. A peer forwards only if the relayed report actually
//! advanced its store, and only while the hop budget lasts. A per-wave
//! visited set makes every agent receive the wave at most once, so the
//! traversal terminates on cyclic topologies independently of the budget.
//!
//! ```text
//!   hop budget 3        2              1            0
//!   origin ──► A (accepted) ──► C (accepted) ──► E   stop
//!          └─► B (stale) ✗
//! ```

use crate::neighbors::NeighborFinder;
use crate::record::{DetectionRecord, Position};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use v2v_env::{AgentId, SubjectId};

/// Where a flood hop is sent from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloodSource {
    /// Sending agent
    pub id: AgentId,

    /// Sender's position when the hop is sent
    pub position: Position,

    /// Sender's broadcast radius
    pub radius: f64,
}

/// A record in transit. The hop budget lives here, never in a store.
#[derive(Debug, Clone)]
struct FloodMessage {
    from: FloodSource,
    hop_budget: u8,
    depth: u8,
}

/// Counters for one wave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FloodReport {
    /// Cross-agent upserts attempted
    pub offered: u64,

    /// Upserts that changed the receiving store
    pub accepted: u64,

    /// Peers skipped because the wave already reached them
    pub suppressed: u64,

    /// Deepest hop that changed a store (0 if none did)
    pub max_depth: u8,
}

/// Floods accepted records outward through the current topology.
#[derive(Clone)]
pub struct GossipDisseminator {
    finder: Arc<dyn NeighborFinder>,
}

impl GossipDisseminator {
    /// Creates a disseminator using `finder` for neighbor queries.
    pub fn new(finder: Arc<dyn NeighborFinder>) -> Self {
        Self { finder }
    }

    /// Floods `record` from `origin` with `hop_budget` hops.
    ///
    /// Relayed copies always carry `observed_locally = false`; the flag
    /// describes the receiving agent's own sensing, not the sender's.
    pub fn broadcast(
        &self,
        origin: FloodSource,
        record: &DetectionRecord,
        hop_budget: u8,
    ) -> FloodReport {
        let mut report = FloodReport::default();

        if hop_budget == 0 {
            return report;
        }

        let mut wave = Wave::new(record.subject, record.timestamp, origin.id);
        let mut queue = VecDeque::new();
        queue.push_back(FloodMessage {
            from: origin,
            hop_budget,
            depth: 1,
        });

        while let Some(message) = queue.pop_front() {
            let peers = self.finder.query(
                &message.from.position,
                message.from.radius,
                message.from.id,
            );

            for peer in peers {
                if !wave.visit(peer.id()) {
                    report.suppressed += 1;
                    continue;
                }

                report.offered += 1;
                let changed = peer
                    .store()
                    .merge(record.subject, record.position, record.timestamp, false)
                    .changed();

                if !changed {
                    continue;
                }

                report.accepted += 1;
                report.max_depth = report.max_depth.max(message.depth);

                let remaining = message.hop_budget - 1;
                if remaining > 0 {
                    queue.push_back(FloodMessage {
                        from: FloodSource {
                            id: peer.id(),
                            position: peer.position(),
                            radius: peer.broadcast_radius(),
                        },
                        hop_budget: remaining,
                        depth: message.depth + 1,
                    });
                }
            }
        }

        debug!(
            origin = %origin.id,
            subject = %record.subject,
            offered = report.offered,
            accepted = report.accepted,
            depth = report.max_depth,
            "flood wave finished"
        );

        report
    }
}

/// Per-broadcast bookkeeping, identified by `(subject, timestamp)`.
struct Wave {
    key: (SubjectId, Duration),
    visited: HashSet<(SubjectId, Duration, AgentId)>,
}

impl Wave {
    fn new(subject: SubjectId, timestamp: Duration, origin: AgentId) -> Self {
        let mut visited = HashSet::new();
        visited.insert((subject, timestamp, origin));
        Self {
            key: (subject, timestamp),
            visited,
        }
    }

    /// Marks `agent` as reached; false if the wave already reached it.
    fn visit(&mut self, agent: AgentId) -> bool {
        self.visited.insert((self.key.0, self.key.1, agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticTopology;

    fn record(t: f64) -> DetectionRecord {
        DetectionRecord::new(
            SubjectId(1),
            Position::new(5.0, 0.0, 0.0),
            Duration::from_secs_f64(t),
            true,
        )
    }

    #[test]
    fn test_zero_budget_sends_nothing() {
        let topo = StaticTopology::full_mesh(4);
        let gossip = GossipDisseminator::new(topo.finder());

        let report = gossip.broadcast(topo.source(0), &record(1.0), 0);

        assert_eq!(report, FloodReport::default());
        assert_eq!(topo.query_count(), 0);
    }

    #[test]
    fn test_chain_stops_at_hop_budget() {
        let topo = StaticTopology::chain(6);
        let gossip = GossipDisseminator::new(topo.finder());

        let report = gossip.broadcast(topo.source(0), &record(1.0), 3);

        assert_eq!(report.accepted, 3);
        assert_eq!(report.max_depth, 3);
        for i in 1..=3 {
            assert!(topo.store(i).get(SubjectId(1)).is_some(), "agent {i} missed");
        }
        assert!(topo.store(4).is_empty());
        assert!(topo.store(5).is_empty());
    }

    #[test]
    fn test_relayed_copies_are_not_first_hand() {
        let topo = StaticTopology::chain(2);
        let gossip = GossipDisseminator::new(topo.finder());

        gossip.broadcast(topo.source(0), &record(1.0), 3);

        assert!(!topo.store(1).get(SubjectId(1)).unwrap().observed_locally);
    }

    #[test]
    fn test_full_mesh_terminates_and_converges() {
        let n = 8;
        let topo = StaticTopology::full_mesh(n);
        let gossip = GossipDisseminator::new(topo.finder());
        let rec = record(4.0);
        topo.store(0).upsert(rec.subject, rec.position, rec.timestamp, true);

        let report = gossip.broadcast(topo.source(0), &rec, 3);

        // Each agent other than the origin is offered the wave exactly once.
        assert_eq!(report.offered, (n - 1) as u64);
        assert_eq!(report.accepted, (n - 1) as u64);
        assert_eq!(report.max_depth, 1);
        for i in 1..n {
            let got = topo.store(i).get(SubjectId(1)).unwrap();
            assert_eq!(got.position, rec.position);
            assert_eq!(got.timestamp, rec.timestamp);
        }
    }

    #[test]
    fn test_stale_peer_does_not_forward() {
        let topo = StaticTopology::chain(3);
        let gossip = GossipDisseminator::new(topo.finder());

        // Agent 1 already knows a newer report.
        topo.store(1)
            .upsert(SubjectId(1), Position::zeros(), Duration::from_secs(9), true);

        let report = gossip.broadcast(topo.source(0), &record(1.0), 3);

        assert_eq!(report.offered, 1);
        assert_eq!(report.accepted, 0);
        assert!(topo.store(2).is_empty());
    }

    #[test]
    fn test_ring_visits_each_agent_once() {
        let topo = StaticTopology::ring(5);
        let gossip = GossipDisseminator::new(topo.finder());

        let report = gossip.broadcast(topo.source(0), &record(1.0), 10);

        assert_eq!(report.accepted, 4);
        assert_eq!(report.offered, 4);
        assert!(report.suppressed > 0);
    }

    #[test]
    fn test_flood_concurrent_with_push_keeps_newest() {
        use crate::pusher::PeriodicPusher;

        let topo = StaticTopology::full_mesh(2);
        let gossip = GossipDisseminator::new(topo.finder());
        let pusher = PeriodicPusher::new(topo.store(1), topo.finder());
        let last = 500;

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for t in 1..=last {
                    let rec = record(t as f64);
                    topo.store(0)
                        .upsert(rec.subject, rec.position, rec.timestamp, true);
                    gossip.broadcast(topo.source(0), &rec, 3);
                }
            });
            scope.spawn(|| {
                for _ in 0..last {
                    pusher.tick(topo.source(1));
                }
            });
        });

        // Pushes of older copies never roll either store back.
        let newest = Duration::from_secs(last);
        assert_eq!(topo.store(0).get(SubjectId(1)).unwrap().timestamp, newest);
        assert_eq!(topo.store(1).get(SubjectId(1)).unwrap().timestamp, newest);
        assert!(topo.store(0).get(SubjectId(1)).unwrap().observed_locally);
    }
}
