//! Scenario runner - executes dissemination scenarios.

use crate::context::SimContext;
use crate::exporter::SimExport;
use crate::network::{LinkController, ProximityIndex};
use crate::scenarios::ScenarioId;
use crate::sensor::{SensorModel, DEFAULT_SAFE_DISTANCE_RADIUS, DEFAULT_TRACE_RANGE};
use crate::topology::FixedTopology;
use crate::world::{SimConfig, SimWorld};

use nalgebra::Vector3;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use v2v_core::{AgentId, Position, RelayAgent, RelayConfig, RelayError, StatsSnapshot, SubjectId};
use v2v_env::RelayContext;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total frames (or scripted steps) executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioMetrics {
    /// First-hand detections that changed a store
    pub detections: u64,

    /// Cross-agent upserts attempted by flood waves
    pub flood_offered: u64,

    /// Flood upserts that changed a store
    pub flood_accepted: u64,

    /// Cross-agent upserts attempted by full syncs
    pub push_offered: u64,

    /// Push upserts that changed a store
    pub push_accepted: u64,

    /// Records removed by reapers
    pub records_expired: u64,

    /// Fraction of (agent, subject) pairs known at the end of the run
    pub coverage: f64,
}

impl ScenarioMetrics {
    fn from_stats(stats: &StatsSnapshot, coverage: f64) -> Self {
        Self {
            detections: stats.detections_accepted,
            flood_offered: stats.flood_offered,
            flood_accepted: stats.flood_accepted,
            push_offered: stats.push_offered,
            push_accepted: stats.push_accepted,
            records_expired: stats.records_expired,
            coverage,
        }
    }
}

/// Collects failed assertions for one run.
#[derive(Default)]
struct Checks {
    failures: Vec<String>,
}

impl Checks {
    fn check(&mut self, ok: bool, describe: impl FnOnce() -> String) {
        if !ok {
            let message = describe();
            debug!(%message, "check failed");
            self.failures.push(message);
        }
    }
}

/// Captures world frames into an optional export.
struct Recorder<'a> {
    export: Option<&'a mut SimExport>,
    every: u64,
}

impl Recorder<'_> {
    fn capture(&mut self, world: &mut SimWorld) {
        if let Some(export) = self.export.as_deref_mut() {
            if world.tick_count() % self.every == 0 {
                export.add_frame(world.frame());
            }
        }
    }

    fn capture_final(&mut self, world: &mut SimWorld) {
        if let Some(export) = self.export.as_deref_mut() {
            export.add_frame(world.frame());
        }
    }
}

/// Runs dissemination scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Number of agents
    num_agents: usize,

    /// Tick rate in Hz
    tick_rate_hz: u32,

    /// Duration of the open-ended phases, in seconds
    max_duration_secs: f64,

    /// Sensor noise for world scenarios
    sensor_noise_std: f64,

    /// Relay parameters for every agent
    relay: RelayConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, num_agents: usize) -> Self {
        Self {
            seed,
            num_agents,
            tick_rate_hz: 30,
            max_duration_secs: 10.0,
            sensor_noise_std: 0.25,
            relay: RelayConfig::default(),
        }
    }

    /// Sets the tick rate.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz;
        self
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// Sets the sensor noise.
    pub fn with_sensor_noise(mut self, std_dev: f64) -> Self {
        self.sensor_noise_std = std_dev;
        self
    }

    /// Sets the relay configuration.
    pub fn with_relay_config(mut self, relay: RelayConfig) -> Self {
        self.relay = relay;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None)
    }

    /// Runs a scenario and records its frames into `export`.
    pub fn run_recorded(&self, scenario: ScenarioId, export: &mut SimExport) -> ScenarioResult {
        let result = self.execute(scenario, Some(&mut *export));
        export.finalize(result.passed, result.failure_reason.clone());
        result
    }

    fn execute(&self, scenario: ScenarioId, export: Option<&mut SimExport>) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let mut recorder = Recorder {
            export,
            every: u64::from(self.tick_rate_hz.max(1)),
        };

        let outcome = match scenario {
            ScenarioId::Handoff => self.run_handoff(),
            ScenarioId::FloodMesh => self.run_flood_mesh(),
            ScenarioId::Chain => self.run_chain(),
            ScenarioId::Partition => self.run_partition(&mut recorder),
            ScenarioId::Expiry => self.run_expiry(&mut recorder),
            ScenarioId::Highway => self.run_highway(&mut recorder),
        };

        outcome.unwrap_or_else(|err| {
            warn!(scenario = scenario.name(), %err, "scenario setup failed");
            ScenarioResult {
                scenario,
                seed: self.seed,
                passed: false,
                total_ticks: 0,
                final_time_secs: 0.0,
                failure_reason: Some(format!("setup failed: {err}")),
                metrics: ScenarioMetrics::default(),
            }
        })
    }

    fn finish(
        &self,
        scenario: ScenarioId,
        checks: Checks,
        total_ticks: u64,
        final_time_secs: f64,
        metrics: ScenarioMetrics,
    ) -> ScenarioResult {
        let passed = checks.failures.is_empty();
        info!(
            "{} complete: {} detections, {} flood / {} push upserts, coverage {:.0}%",
            scenario.name(),
            metrics.detections,
            metrics.flood_offered,
            metrics.push_offered,
            metrics.coverage * 100.0
        );

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            total_ticks,
            final_time_secs,
            failure_reason: (!passed).then(|| checks.failures.join("; ")),
            metrics,
        }
    }

    fn world_config(&self) -> SimConfig {
        SimConfig {
            seed: self.seed,
            tick_rate_hz: self.tick_rate_hz,
            relay: self.relay.clone(),
            sensor_noise_std: self.sensor_noise_std,
        }
    }

    fn agent_config(&self, name: String) -> RelayConfig {
        RelayConfig {
            name,
            ..self.relay.clone()
        }
    }

    /// SIM-001: Handoff.
    ///
    /// A sees W at t=10 and pushes once to B. B re-observes W at t=10.5.
    /// Both forget W once the staleness threshold has passed. Flooding is
    /// switched off so the push alone carries the record.
    fn run_handoff(&self) -> Result<ScenarioResult, RelayError> {
        info!("SIM-001: Handoff - push-driven hand-over and eviction");

        let ctx = SimContext::new(self.seed);
        let index = Arc::new(ProximityIndex::new(Arc::new(LinkController::new())));
        let config = RelayConfig {
            max_hop_budget: 0,
            ..self.relay.clone()
        };

        let a = RelayAgent::new(
            AgentId::from_seed(0),
            RelayConfig {
                name: "A".into(),
                ..config.clone()
            },
            index.clone(),
        )?;
        let b = RelayAgent::new(
            AgentId::from_seed(1),
            RelayConfig {
                name: "B".into(),
                ..config
            },
            index.clone(),
        )?
        .with_position(Position::new(100.0, 0.0, 0.0));
        index.refresh(vec![a.peer_handle(), b.peer_handle()]);

        let w = SubjectId(0);
        let first = Position::new(5.0, 0.0, 0.0);
        let second = Position::new(5.2, 0.0, 0.0);
        let mut checks = Checks::default();

        ctx.set_time(Duration::from_secs(10));
        a.on_detected(w, first, ctx.now());
        let on_a = a.store().get(w);
        checks.check(
            on_a.as_ref()
                .is_some_and(|r| r.position == first && r.observed_locally),
            || format!("A should hold W locally after sensing, got {on_a:?}"),
        );
        checks.check(b.store().get(w).is_none(), || {
            "B received W before any push".into()
        });

        ctx.advance_time(Duration::from_millis(200));
        a.push_tick(ctx.now());
        let on_b = b.store().get(w);
        checks.check(
            on_b.as_ref().is_some_and(|r| {
                r.position == first && r.timestamp == Duration::from_secs(10) && !r.observed_locally
            }),
            || format!("B should hold relayed W@10.0 after one push, got {on_b:?}"),
        );

        ctx.set_time(Duration::from_millis(10_500));
        b.on_detected(w, second, ctx.now());
        let on_b = b.store().get(w);
        checks.check(
            on_b.as_ref().is_some_and(|r| {
                r.position == second
                    && r.timestamp == Duration::from_millis(10_500)
                    && r.observed_locally
            }),
            || format!("B should hold local W@10.5 after sensing, got {on_b:?}"),
        );

        let evict_at =
            Duration::from_millis(10_500) + self.relay.staleness_threshold() + Duration::from_millis(500);
        ctx.set_time(evict_at);
        a.begin_cycle(ctx.now());
        b.begin_cycle(ctx.now());
        checks.check(a.store().get(w).is_none() && b.store().get(w).is_none(), || {
            format!("W should be gone everywhere at t={:.1}s", evict_at.as_secs_f64())
        });

        let mut stats = a.stats();
        stats.accumulate(&b.stats());
        let metrics = ScenarioMetrics::from_stats(&stats, 0.0);
        Ok(self.finish(ScenarioId::Handoff, checks, 4, ctx.now().as_secs_f64(), metrics))
    }

    /// Builds `n` co-located agents wired through `topology`.
    fn fixed_fleet(
        &self,
        topology: &Arc<FixedTopology>,
        n: usize,
    ) -> Result<Vec<RelayAgent>, RelayError> {
        let mut agents = Vec::with_capacity(n);
        for i in 0..n {
            let agent = RelayAgent::new(
                AgentId::from_seed(i as u64),
                self.agent_config(format!("node-{i}")),
                topology.clone(),
            )?;
            topology.register(agent.peer_handle());
            agents.push(agent);
        }
        Ok(agents)
    }

    /// SIM-002: FloodMesh.
    ///
    /// One wave over a fully connected topology: every other agent is
    /// offered the record exactly once and all end up agreeing.
    fn run_flood_mesh(&self) -> Result<ScenarioResult, RelayError> {
        info!("SIM-002: FloodMesh - termination and convergence on a full mesh");

        let n = self.num_agents.max(2);
        let topology = Arc::new(FixedTopology::full(n));
        let agents = self.fixed_fleet(&topology, n)?;

        let w = SubjectId(0);
        let position = Position::new(12.0, -3.0, 0.0);
        let now = Duration::from_secs(1);
        agents[0].on_detected(w, position, now);

        let mut checks = Checks::default();
        let budget = self.relay.max_hop_budget;
        let offered = agents[0].stats().flood_offered;
        let expected = if budget > 0 { (n - 1) as u64 } else { 0 };
        checks.check(offered == expected, || {
            format!("expected {expected} flood upserts, saw {offered}")
        });

        if budget > 0 {
            for (i, agent) in agents.iter().enumerate().skip(1) {
                let record = agent.store().get(w);
                checks.check(
                    record
                        .as_ref()
                        .is_some_and(|r| r.position == position && r.timestamp == now),
                    || format!("agent {i} did not converge, got {record:?}"),
                );
            }
        }

        let holders = agents.iter().filter(|a| a.store().get(w).is_some()).count();
        let mut stats = StatsSnapshot::default();
        for agent in &agents {
            stats.accumulate(&agent.stats());
        }
        let metrics = ScenarioMetrics::from_stats(&stats, holders as f64 / n as f64);
        Ok(self.finish(ScenarioId::FloodMesh, checks, 1, now.as_secs_f64(), metrics))
    }

    /// SIM-003: Chain.
    ///
    /// A wave on a line reaches exactly `max_hop_budget` agents. A single
    /// push from the last holder then moves the record one hop further and
    /// no more, since pushed records are not re-flooded.
    fn run_chain(&self) -> Result<ScenarioResult, RelayError> {
        info!("SIM-003: Chain - hop budget bound");

        let k = usize::from(self.relay.max_hop_budget);
        let n = self.num_agents.max(k + 3);
        let topology = Arc::new(FixedTopology::chain(n));
        let agents = self.fixed_fleet(&topology, n)?;

        let w = SubjectId(0);
        let now = Duration::from_secs(1);
        agents[0].on_detected(w, Position::zeros(), now);

        let mut checks = Checks::default();
        for (i, agent) in agents.iter().enumerate().skip(1) {
            let holds = agent.store().get(w).is_some();
            checks.check(holds == (i <= k), || {
                format!("agent {i} holds={holds} after a {k}-hop wave")
            });
        }

        agents[k].push_tick(now);
        checks.check(agents[k + 1].store().get(w).is_some(), || {
            format!("push from agent {k} did not reach agent {}", k + 1)
        });
        checks.check(agents[k + 2].store().get(w).is_none(), || {
            format!("pushed record was re-flooded to agent {}", k + 2)
        });

        let holders = agents.iter().filter(|a| a.store().get(w).is_some()).count();
        let mut stats = StatsSnapshot::default();
        for agent in &agents {
            stats.accumulate(&agent.stats());
        }
        let metrics = ScenarioMetrics::from_stats(&stats, holders as f64 / n as f64);
        Ok(self.finish(ScenarioId::Chain, checks, 2, now.as_secs_f64(), metrics))
    }

    /// SIM-004: Partition.
    ///
    /// Group A sits next to a walker, group B is in radio range but out of
    /// sensor range. While partitioned B learns nothing; after healing every
    /// vehicle holds the walker, B only second-hand.
    fn run_partition(&self, recorder: &mut Recorder<'_>) -> Result<ScenarioResult, RelayError> {
        info!("SIM-004: Partition - split, heal, converge");

        let n = self.num_agents.clamp(4, 16);
        let half = n / 2;
        let mut world = SimWorld::new(self.world_config())?;

        for i in 0..n {
            let x = if i < half {
                i as f64 * 25.0
            } else {
                600.0 + (i - half) as f64 * 25.0
            };
            world.spawn_vehicle(
                Position::new(x, 0.0, 0.0),
                Vector3::zeros(),
                SensorModel::proximity(DEFAULT_SAFE_DISTANCE_RADIUS),
            )?;
        }
        let w = world
            .oracle
            .spawn_walker(Vector3::new(-300.0, 0.0, 0.0), Vector3::zeros());

        let group_a: Vec<usize> = (0..half).collect();
        let group_b: Vec<usize> = (half..n).collect();
        world.partition(&group_a, &group_b);

        let split_secs = (self.max_duration_secs / 2.0).max(2.0);
        let split_end = Duration::from_secs_f64(split_secs);
        while world.now() < split_end {
            world.tick();
            recorder.capture(&mut world);
        }

        let mut checks = Checks::default();
        let holds = |world: &SimWorld, i: usize| {
            world
                .vehicle(i)
                .and_then(|v| v.agent().store().get(w))
                .is_some()
        };
        checks.check(group_a.iter().all(|&i| holds(&world, i)), || {
            "group A lost the walker during the partition".into()
        });
        checks.check(group_b.iter().all(|&i| !holds(&world, i)), || {
            "walker crossed the partition".into()
        });

        world.heal();
        let heal_secs = (self.max_duration_secs - split_secs)
            .max(self.relay.push_interval_secs + 0.5);
        let end = world.now() + Duration::from_secs_f64(heal_secs);
        while world.now() < end {
            world.tick();
            recorder.capture(&mut world);
        }
        recorder.capture_final(&mut world);

        checks.check(world.holders(w) == n, || {
            format!("only {}/{} vehicles hold the walker after healing", world.holders(w), n)
        });
        for &i in &group_b {
            let record = world.vehicle(i).and_then(|v| v.agent().store().get(w));
            checks.check(record.as_ref().is_some_and(|r| !r.observed_locally), || {
                format!("vehicle {i} should hold the walker second-hand, got {record:?}")
            });
        }

        let coverage = world.holders(w) as f64 / n as f64;
        let metrics = ScenarioMetrics::from_stats(&world.stats(), coverage);
        Ok(self.finish(
            ScenarioId::Partition,
            checks,
            world.tick_count(),
            world.time(),
            metrics,
        ))
    }

    /// SIM-005: Expiry.
    ///
    /// A walker seen by three vehicles leaves the world. Its records must
    /// survive until the staleness threshold and vanish right after, even
    /// though pushes keep re-offering them.
    fn run_expiry(&self, recorder: &mut Recorder<'_>) -> Result<ScenarioResult, RelayError> {
        info!("SIM-005: Expiry - staleness eviction");

        let mut world = SimWorld::new(self.world_config())?;
        for i in 0..3 {
            world.spawn_vehicle(
                Position::new(i as f64 * 100.0, 0.0, 0.0),
                Vector3::zeros(),
                SensorModel::proximity(DEFAULT_SAFE_DISTANCE_RADIUS),
            )?;
        }
        let w = world
            .oracle
            .spawn_walker(Vector3::new(50.0, 50.0, 0.0), Vector3::zeros());

        while world.now() < Duration::from_secs(2) {
            world.tick();
            recorder.capture(&mut world);
        }
        world.remove_walker(w);

        let last_seen = world
            .vehicles()
            .iter()
            .filter_map(|v| v.agent().store().get(w))
            .map(|r| r.timestamp)
            .max()
            .unwrap_or_default();
        let threshold = self.relay.staleness_threshold();

        let mut checks = Checks::default();
        let just_before = (last_seen + threshold).saturating_sub(Duration::from_millis(100));
        while world.now() < just_before {
            world.tick();
            recorder.capture(&mut world);
        }
        checks.check(world.holders(w) == 3, || {
            format!(
                "records evicted early: {}/3 holders at t={:.2}s",
                world.holders(w),
                world.time()
            )
        });

        let just_after = last_seen + threshold + Duration::from_millis(200);
        while world.now() < just_after {
            world.tick();
            recorder.capture(&mut world);
        }
        recorder.capture_final(&mut world);
        checks.check(world.holders(w) == 0, || {
            format!(
                "records outlived the threshold: {}/3 holders at t={:.2}s",
                world.holders(w),
                world.time()
            )
        });

        let stats = world.stats();
        checks.check(stats.records_expired >= 3, || {
            format!("expected at least 3 evictions, saw {}", stats.records_expired)
        });

        let metrics = ScenarioMetrics::from_stats(&stats, 0.0);
        Ok(self.finish(
            ScenarioId::Expiry,
            checks,
            world.tick_count(),
            world.time(),
            metrics,
        ))
    }

    /// SIM-006: Highway.
    ///
    /// A convoy with rotating sensors drives past wandering walkers. After
    /// the drive, sensors switch off and a settle phase of full syncs lets
    /// the convoy agree; every store must then hold the same subjects and
    /// nothing older than the staleness threshold.
    fn run_highway(&self, recorder: &mut Recorder<'_>) -> Result<ScenarioResult, RelayError> {
        info!("SIM-006: Highway - moving convoy with sweep sensors");

        const SPACING: f64 = 300.0;
        let n = self.num_agents.clamp(2, 24);
        let mut world = SimWorld::new(self.world_config())?;

        for i in 0..n {
            world.spawn_vehicle(
                Position::new(i as f64 * SPACING, 0.0, 0.0),
                Vector3::new(15.0, 0.0, 0.0),
                SensorModel::sweep(DEFAULT_TRACE_RANGE),
            )?;
        }

        let span = n as f64 * SPACING;
        let layout: Vec<(Vector3<f64>, Vector3<f64>)> = world.context.with_rng(|rng| {
            (0..2 * n)
                .map(|_| {
                    let position = Vector3::new(
                        rng.gen_range(-500.0..span + 500.0),
                        rng.gen_range(-400.0..400.0),
                        0.0,
                    );
                    let velocity =
                        Vector3::new(rng.gen_range(-1.5..1.5), rng.gen_range(-1.5..1.5), 0.0);
                    (position, velocity)
                })
                .collect()
        });
        for (position, velocity) in layout {
            world.oracle.spawn_walker(position, velocity);
        }

        let drive_end = Duration::from_secs_f64(self.max_duration_secs.max(1.0));
        while world.now() < drive_end {
            world.tick();
            recorder.capture(&mut world);
            if world.tick_count() % u64::from(self.tick_rate_hz.max(1)) == 0 {
                debug!(
                    "  t={:.1}s | walkers={} | detections={}",
                    world.time(),
                    world.oracle.active_count(),
                    world.stats().detections_accepted
                );
            }
        }

        let pairs = (n * world.oracle.active_count()).max(1);
        let known: usize = world
            .vehicles()
            .iter()
            .map(|v| v.agent().store().len())
            .sum();
        let coverage = known as f64 / pairs as f64;

        world.set_sensing(false);
        let rounds = (span / self.relay.broadcast_radius).ceil() + 2.0;
        world.run_for(rounds * self.relay.push_interval_secs);
        recorder.capture_final(&mut world);

        let mut checks = Checks::default();
        let stats = world.stats();
        checks.check(stats.detections_accepted > 0, || "no walker was ever detected".into());

        let now = world.now();
        let threshold = self.relay.staleness_threshold();
        let subject_sets: Vec<BTreeSet<SubjectId>> = world
            .vehicles()
            .iter()
            .map(|v| {
                let records = v.agent().store().snapshot();
                for record in &records {
                    checks.check(!record.is_stale(now, threshold), || {
                        format!("vehicle {} kept stale {}", v.index(), record.subject)
                    });
                }
                records.into_iter().map(|r| r.subject).collect()
            })
            .collect();
        for (i, set) in subject_sets.iter().enumerate().skip(1) {
            checks.check(*set == subject_sets[0], || {
                format!(
                    "vehicle {i} knows {} subjects, vehicle 0 knows {}",
                    set.len(),
                    subject_sets[0].len()
                )
            });
        }

        let metrics = ScenarioMetrics::from_stats(&stats, coverage);
        Ok(self.finish(
            ScenarioId::Highway,
            checks,
            world.tick_count(),
            world.time(),
            metrics,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handoff_scenario() {
        let result = ScenarioRunner::new(42, 2).run(ScenarioId::Handoff);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!((result.final_time_secs - 31.0).abs() < 1e-9);
        assert_eq!(result.metrics.flood_offered, 0);
        assert!(result.metrics.push_accepted >= 1);
    }

    #[test]
    fn test_flood_mesh_scenario() {
        let result = ScenarioRunner::new(42, 8).run(ScenarioId::FloodMesh);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.flood_offered, 7);
        assert_eq!(result.metrics.coverage, 1.0);
    }

    #[test]
    fn test_flood_mesh_with_zero_budget() {
        let relay = RelayConfig {
            max_hop_budget: 0,
            ..RelayConfig::default()
        };
        let result = ScenarioRunner::new(42, 5)
            .with_relay_config(relay)
            .run(ScenarioId::FloodMesh);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.flood_offered, 0);
    }

    #[test]
    fn test_chain_scenario() {
        let result = ScenarioRunner::new(42, 6).run(ScenarioId::Chain);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.flood_accepted, 3);
    }

    #[test]
    fn test_partition_scenario() {
        let result = ScenarioRunner::new(42, 6)
            .with_duration(6.0)
            .run(ScenarioId::Partition);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.coverage, 1.0);
    }

    #[test]
    fn test_expiry_scenario() {
        let result = ScenarioRunner::new(42, 3).run(ScenarioId::Expiry);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.final_time_secs > 22.0);
    }

    #[test]
    fn test_highway_scenario() {
        let result = ScenarioRunner::new(42, 6)
            .with_duration(5.0)
            .run(ScenarioId::Highway);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.detections > 0);
    }

    #[test]
    fn test_highway_deterministic() {
        let runner = ScenarioRunner::new(7, 4).with_duration(3.0);

        let first = runner.run(ScenarioId::Highway);
        let second = runner.run(ScenarioId::Highway);

        assert_eq!(first.metrics, second.metrics);
        assert_eq!(first.total_ticks, second.total_ticks);
    }

    #[test]
    fn test_recorded_run_fills_export() {
        let runner = ScenarioRunner::new(42, 4).with_duration(4.0);
        let mut export = SimExport::new("partition", 42);

        let result = runner.run_recorded(ScenarioId::Partition, &mut export);

        assert!(result.passed);
        assert!(export.passed);
        assert!(export.frames.len() >= 4);
        assert!(export.frames.iter().any(|f| !f.events.is_empty()));
    }

    #[test]
    fn test_invalid_relay_config_fails_cleanly() {
        let relay = RelayConfig {
            broadcast_radius: -1.0,
            ..RelayConfig::default()
        };
        let result = ScenarioRunner::new(42, 4)
            .with_relay_config(relay)
            .run(ScenarioId::Partition);

        assert!(!result.passed);
        assert!(result.failure_reason.unwrap().starts_with("setup failed"));
    }
}
