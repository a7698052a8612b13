//! Agent Runtime - Wires one store to its ingestor, disseminators and reaper.
//!
//! This module provides the integration layer between the dissemination
//! components and the host. Components are connected by reference at
//! construction time; nothing is discovered at run time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        RelayAgent                           │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │           Arc<LocalStore>  (one lock per agent)      │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │        ▲             ▲              │              │        │
//! │  ┌─────┴─────┐ ┌─────┴────┐  ┌──────▼─────┐ ┌──────▼─────┐  │
//! │  │ Ingestor  │ │  Reaper  │  │   Gossip   │ │   Pusher   │  │
//! │  └───────────┘ └──────────┘  └────────────┘ └────────────┘  │
//! │                                    │  Arc<dyn NeighborFinder>│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Host contract
//!
//! Per frame: [`RelayAgent::begin_cycle`] (reaper), then
//! [`RelayAgent::on_detected`] for each sensing event.
//! Every push interval: [`RelayAgent::push_tick`], or let
//! [`RelayAgent::run_push_loop`] drive it from a [`RelayContext`].

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::gossip::{FloodSource, GossipDisseminator};
use crate::ingest::{DetectionIngestor, IngestOutcome};
use crate::neighbors::{NeighborFinder, PeerHandle};
use crate::pusher::{PeriodicPusher, PushReport};
use crate::reaper::Reaper;
use crate::record::Position;
use crate::stats::{RelayStats, StatsSnapshot};
use crate::store::LocalStore;

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use v2v_env::{AgentId, IntervalTimer, RelayContext, SubjectId};

/// A relay agent: one store plus the components that feed and spread it.
pub struct RelayAgent {
    /// Agent identifier
    pub id: AgentId,

    /// Configuration
    pub config: RelayConfig,

    /// The agent's detection store
    store: Arc<LocalStore>,

    /// Current world position, updated by the host as the agent moves
    position: RwLock<Position>,

    ingestor: DetectionIngestor,
    gossip: GossipDisseminator,
    pusher: PeriodicPusher,
    reaper: Reaper,

    stats: RelayStats,
}

impl RelayAgent {
    /// Creates a new agent using `finder` for peer discovery.
    pub fn new(
        id: AgentId,
        config: RelayConfig,
        finder: Arc<dyn NeighborFinder>,
    ) -> Result<Self, RelayError> {
        config.validate()?;

        let store = Arc::new(LocalStore::new(id));
        let ingestor = DetectionIngestor::new(Arc::clone(&store), None);
        let gossip = GossipDisseminator::new(Arc::clone(&finder));
        let pusher = PeriodicPusher::new(Arc::clone(&store), finder);
        let reaper = Reaper::new(Arc::clone(&store), config.staleness_threshold());

        Ok(Self {
            id,
            config,
            store,
            position: RwLock::new(Position::zeros()),
            ingestor,
            gossip,
            pusher,
            reaper,
            stats: RelayStats::default(),
        })
    }

    /// Marks `subject` as the agent's own body so its sensor ignores it.
    pub fn with_self_subject(mut self, subject: SubjectId) -> Self {
        self.ingestor = DetectionIngestor::new(Arc::clone(&self.store), Some(subject));
        self
    }

    /// Sets the starting position.
    pub fn with_position(self, position: Position) -> Self {
        *self.position.write() = position;
        self
    }

    /// Returns the agent's store.
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// Returns the current position.
    pub fn position(&self) -> Position {
        *self.position.read()
    }

    /// Moves the agent.
    pub fn set_position(&self, position: Position) {
        *self.position.write() = position;
    }

    /// Handle other agents use to reach this one.
    pub fn peer_handle(&self) -> PeerHandle {
        PeerHandle::new(
            self.id,
            self.position(),
            self.config.broadcast_radius,
            Arc::clone(&self.store),
        )
    }

    fn source(&self) -> FloodSource {
        FloodSource {
            id: self.id,
            position: self.position(),
            radius: self.config.broadcast_radius,
        }
    }

    /// Per-cycle hook: evicts stale records before any dissemination.
    pub fn begin_cycle(&self, now: Duration) -> HashSet<SubjectId> {
        let removed = self.reaper.run(now);
        self.stats.record_expired(removed.len());
        removed
    }

    /// Ingests a first-hand detection and floods it if the store changed.
    pub fn on_detected(
        &self,
        subject: SubjectId,
        position: Position,
        now: Duration,
    ) -> IngestOutcome {
        let outcome = self.ingestor.on_detected(subject, position, now);
        self.stats.record_ingest(&outcome);

        if let Some(record) = outcome.accepted() {
            let report = self
                .gossip
                .broadcast(self.source(), record, self.config.max_hop_budget);
            self.stats.record_flood(&report);
        }

        outcome
    }

    /// Runs one full-sync push. The reaper runs first so nothing stale leaves.
    pub fn push_tick(&self, now: Duration) -> PushReport {
        self.begin_cycle(now);
        let report = self.pusher.tick(self.source());
        self.stats.record_push(&report);
        report
    }

    /// Drives [`RelayAgent::push_tick`] every push interval from `ctx`.
    ///
    /// Runs `max_ticks` pushes, or forever if `None`. Returns the number of
    /// pushes performed.
    pub async fn run_push_loop<Ctx: RelayContext>(
        &self,
        ctx: &Ctx,
        max_ticks: Option<u64>,
    ) -> Result<u64, RelayError> {
        let mut timer = IntervalTimer::starting_at(self.config.push_interval(), ctx.now())?;
        info!(
            agent = %self.id,
            name = %self.config.name,
            interval_ms = self.config.push_interval().as_millis() as u64,
            "push loop started"
        );

        loop {
            if max_ticks.is_some_and(|max| timer.fired() >= max) {
                return Ok(timer.fired());
            }

            let wait = timer.next_due().saturating_sub(ctx.now());
            ctx.sleep(wait).await;

            let now = ctx.now();
            if timer.poll(now) {
                let report = self.push_tick(now);
                debug!(agent = %self.id, accepted = report.accepted, "push tick");
            }
        }
    }

    /// Returns a copy of the counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl std::fmt::Debug for RelayAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayAgent")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("records", &self.store.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbors::NoNeighbors;
    use std::sync::Mutex;
    use v2v_env::TokioContext;

    /// Finder over a shared list of agents, filtered by distance.
    #[derive(Default)]
    struct Roster {
        agents: Mutex<Vec<PeerHandle>>,
    }

    impl Roster {
        fn add(&self, agent: &RelayAgent) {
            self.agents.lock().unwrap().push(agent.peer_handle());
        }
    }

    impl NeighborFinder for Roster {
        fn query(&self, position: &Position, radius: f64, exclude: AgentId) -> Vec<PeerHandle> {
            self.agents
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.id() != exclude && (p.position() - position).norm() <= radius)
                .cloned()
                .collect()
        }
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn pair() -> (Arc<Roster>, RelayAgent, RelayAgent) {
        let roster = Arc::new(Roster::default());
        let a = RelayAgent::new(AgentId::from_seed(1), RelayConfig::default(), roster.clone())
            .unwrap();
        let b = RelayAgent::new(AgentId::from_seed(2), RelayConfig::default(), roster.clone())
            .unwrap()
            .with_position(Position::new(100.0, 0.0, 0.0));
        roster.add(&a);
        roster.add(&b);
        (roster, a, b)
    }

    #[test]
    fn test_agent_config_default() {
        let config = RelayConfig::default();
        assert_eq!(config.max_hop_budget, 3);
        assert_eq!(config.broadcast_radius, 1000.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RelayConfig {
            broadcast_radius: 0.0,
            ..RelayConfig::default()
        };
        assert!(RelayAgent::new(AgentId::from_seed(1), config, Arc::new(NoNeighbors)).is_err());
    }

    #[test]
    fn test_detection_floods_to_neighbor() {
        let (_roster, a, b) = pair();

        a.on_detected(SubjectId(7), Position::new(5.0, 0.0, 0.0), secs(10.0));

        let relayed = b.store().get(SubjectId(7)).unwrap();
        assert!(!relayed.observed_locally);
        assert_eq!(relayed.timestamp, secs(10.0));
        assert_eq!(a.stats().flood_accepted, 1);
    }

    #[test]
    fn test_handoff_scenario() {
        // Pushes only: A's flood is disabled by a zero hop budget.
        let roster = Arc::new(Roster::default());
        let config = RelayConfig {
            max_hop_budget: 0,
            ..RelayConfig::default()
        };
        let a = RelayAgent::new(AgentId::from_seed(1), config.clone(), roster.clone()).unwrap();
        let b = RelayAgent::new(AgentId::from_seed(2), config, roster.clone())
            .unwrap()
            .with_position(Position::new(100.0, 0.0, 0.0));
        roster.add(&a);
        roster.add(&b);
        let w = SubjectId(7);

        a.on_detected(w, Position::new(5.0, 0.0, 0.0), secs(10.0));
        assert!(b.store().get(w).is_none());

        a.push_tick(secs(10.2));
        let on_b = b.store().get(w).unwrap();
        assert_eq!(on_b.position, Position::new(5.0, 0.0, 0.0));
        assert_eq!(on_b.timestamp, secs(10.0));
        assert!(!on_b.observed_locally);

        b.on_detected(w, Position::new(5.2, 0.0, 0.0), secs(10.5));
        let on_b = b.store().get(w).unwrap();
        assert_eq!(on_b.position, Position::new(5.2, 0.0, 0.0));
        assert_eq!(on_b.timestamp, secs(10.5));
        assert!(on_b.observed_locally);

        a.begin_cycle(secs(31.0));
        b.begin_cycle(secs(31.0));
        assert!(a.store().get(w).is_none());
        assert!(b.store().get(w).is_none());
    }

    #[test]
    fn test_push_skips_stale_records() {
        let (_roster, a, b) = pair();

        a.store()
            .upsert(SubjectId(1), Position::zeros(), secs(0.0), true);
        let report = a.push_tick(secs(25.0));

        assert_eq!(report.records, 0);
        assert!(b.store().is_empty());
        assert_eq!(a.stats().records_expired, 1);
    }

    #[test]
    fn test_out_of_range_peer_not_reached() {
        let roster = Arc::new(Roster::default());
        let a = RelayAgent::new(AgentId::from_seed(1), RelayConfig::default(), roster.clone())
            .unwrap();
        let far = RelayAgent::new(AgentId::from_seed(2), RelayConfig::default(), roster.clone())
            .unwrap()
            .with_position(Position::new(5000.0, 0.0, 0.0));
        roster.add(&a);
        roster.add(&far);

        a.on_detected(SubjectId(1), Position::zeros(), secs(1.0));
        a.push_tick(secs(1.5));

        assert!(far.store().is_empty());
    }

    #[test]
    fn test_self_subject_ignored() {
        let a = RelayAgent::new(AgentId::from_seed(1), RelayConfig::default(), Arc::new(NoNeighbors))
            .unwrap()
            .with_self_subject(SubjectId(1000));

        a.on_detected(SubjectId(1000), Position::zeros(), secs(1.0));

        assert!(a.store().is_empty());
        assert_eq!(a.stats().detections_rejected, 1);
    }

    #[tokio::test]
    async fn test_run_push_loop_counts_ticks() {
        let ctx = TokioContext::new();
        let config = RelayConfig {
            push_interval_secs: 0.01,
            ..RelayConfig::default()
        };
        let a = RelayAgent::new(AgentId::from_seed(1), config, Arc::new(NoNeighbors)).unwrap();

        let ticks = a.run_push_loop(&ctx, Some(3)).await.unwrap();

        assert_eq!(ticks, 3);
        assert_eq!(a.stats().push_ticks, 3);
    }
}
