//! SimWorld - The simulation harness container.

use crate::agent::SimVehicle;
use crate::context::SimContext;
use crate::exporter::{EntityPosition, SimEvent, SimFrame, VehicleFrame};
use crate::network::{LinkController, ProximityIndex};
use crate::oracle::Oracle;
use crate::sensor::SensorModel;

use nalgebra::Vector3;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use v2v_core::{
    AgentId, NeighborFinder, Position, RelayAgent, RelayConfig, RelayError, StatsSnapshot,
    SubjectId,
};
use v2v_env::{IntervalTimer, RelayContext};

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Frame rate in Hz
    pub tick_rate_hz: u32,

    /// Relay parameters shared by every vehicle
    pub relay: RelayConfig,

    /// Position noise standard deviation for sensor observations
    pub sensor_noise_std: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_rate_hz: 30,
            relay: RelayConfig::default(),
            sensor_noise_std: 0.0,
        }
    }
}

/// The SimWorld - container for the entire simulation.
///
/// Each frame: advance the clock, move walkers and vehicles, refresh the
/// proximity index, then per vehicle run the reaper and the sensor. Every
/// push interval all vehicles run a full sync.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: Arc<SimContext>,

    /// Ground truth oracle
    pub oracle: Oracle,

    /// Link controller for fault injection
    links: Arc<LinkController>,

    /// Neighbor finder handed to every vehicle
    index: Arc<ProximityIndex>,

    vehicles: Vec<SimVehicle>,

    push_timer: IntervalTimer,

    /// Sensors run only while this is set
    sensing: bool,

    tick_count: u64,
    push_count: u64,

    /// Events not yet written to a frame
    events: Vec<SimEvent>,
}

impl SimWorld {
    /// Creates a new SimWorld with the given configuration.
    pub fn new(config: SimConfig) -> Result<Self, RelayError> {
        config.relay.validate()?;
        if config.tick_rate_hz == 0 {
            return Err(RelayError::invalid_config("tick_rate_hz must be positive"));
        }

        // Derive separate seeds for different subsystems
        let physics_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);

        let context = SimContext::shared(config.seed);
        let mut oracle = Oracle::new(physics_seed);
        oracle.set_position_noise(config.sensor_noise_std);

        let links = Arc::new(LinkController::new());
        let index = Arc::new(ProximityIndex::new(Arc::clone(&links)));
        let push_timer = IntervalTimer::new(config.relay.push_interval())?;

        Ok(Self {
            config,
            context,
            oracle,
            links,
            index,
            vehicles: Vec::new(),
            push_timer,
            sensing: true,
            tick_count: 0,
            push_count: 0,
            events: Vec::new(),
        })
    }

    /// Returns the finder every vehicle queries.
    pub fn finder(&self) -> Arc<dyn NeighborFinder> {
        self.index.clone()
    }

    /// Spawns a vehicle and returns its id.
    pub fn spawn_vehicle(
        &mut self,
        position: Position,
        velocity: Vector3<f64>,
        sensor: SensorModel,
    ) -> Result<AgentId, RelayError> {
        let idx = self.vehicles.len();
        let id = AgentId::from_seed(idx as u64);
        let config = RelayConfig {
            name: format!("vehicle-{idx}"),
            ..self.config.relay.clone()
        };

        let agent = RelayAgent::new(id, config, self.finder())?.with_position(position);
        self.vehicles.push(SimVehicle::new(agent, velocity, sensor, idx));
        self.refresh_index();

        debug!(agent = %id, idx, "vehicle spawned");
        Ok(id)
    }

    fn refresh_index(&self) {
        self.index.refresh(
            self.vehicles
                .iter()
                .map(|v| v.agent().peer_handle())
                .collect(),
        );
    }

    /// Advances simulation by one frame.
    pub fn tick(&mut self) {
        let dt = 1.0 / self.config.tick_rate_hz as f64;

        self.context.advance_time(Duration::from_secs_f64(dt));
        self.oracle.step(dt);
        for vehicle in &mut self.vehicles {
            vehicle.step(dt);
        }
        self.refresh_index();

        let now = self.context.now();
        let truth = if self.sensing {
            self.oracle.ground_truth()
        } else {
            Vec::new()
        };

        for vehicle in &mut self.vehicles {
            vehicle.agent().begin_cycle(now);
            if self.sensing {
                vehicle.sense(&mut self.oracle, &truth, dt, now);
            }
        }

        if self.push_timer.poll(now) {
            for vehicle in &self.vehicles {
                vehicle.agent().push_tick(now);
            }
            self.push_count += 1;
        }

        self.tick_count += 1;
    }

    /// Ticks until the clock reaches `time`.
    pub fn run_until(&mut self, time: Duration) {
        while self.context.now() < time {
            self.tick();
        }
    }

    /// Ticks for `secs` seconds of simulated time.
    pub fn run_for(&mut self, secs: f64) {
        let end = self.context.now() + Duration::from_secs_f64(secs.max(0.0));
        self.run_until(end);
    }

    /// Enables or disables every sensor.
    pub fn set_sensing(&mut self, enabled: bool) {
        self.sensing = enabled;
    }

    /// Cuts links between two groups of vehicles, by index.
    pub fn partition(&mut self, group_a: &[usize], group_b: &[usize]) {
        let ids = |group: &[usize]| -> Vec<AgentId> {
            group
                .iter()
                .filter_map(|&i| self.vehicles.get(i).map(SimVehicle::id))
                .collect()
        };
        self.links.partition(ids(group_a), ids(group_b));

        info!(t = self.time(), ?group_a, ?group_b, "partition applied");
        self.events
            .push(SimEvent::info(format!("partition {group_a:?} | {group_b:?}")));
    }

    /// Heals every partition.
    pub fn heal(&mut self) {
        self.links.heal_all();
        info!(t = self.time(), "partition healed");
        self.events.push(SimEvent::info("partition healed"));
    }

    /// Removes a walker from the world.
    pub fn remove_walker(&mut self, id: SubjectId) {
        self.oracle.remove_walker(id);
        self.events.push(SimEvent::info(format!("{id} left the world")));
    }

    /// Captures the current state as an export frame.
    pub fn frame(&mut self) -> SimFrame {
        SimFrame {
            time_sec: self.time(),
            walkers: self
                .oracle
                .ground_truth()
                .into_iter()
                .map(|(id, pos)| EntityPosition::new(id.raw(), pos))
                .collect(),
            vehicles: self
                .vehicles
                .iter()
                .map(|v| {
                    let pos = v.position();
                    VehicleFrame {
                        agent_id: v.id().to_string(),
                        x: pos.x,
                        y: pos.y,
                        z: pos.z,
                        records: v.agent().store().snapshot(),
                    }
                })
                .collect(),
            events: std::mem::take(&mut self.events),
        }
    }

    /// Number of vehicles whose store holds `subject`.
    pub fn holders(&self, subject: SubjectId) -> usize {
        self.vehicles
            .iter()
            .filter(|v| v.agent().store().get(subject).is_some())
            .count()
    }

    /// Sum of every vehicle's counters.
    pub fn stats(&self) -> StatsSnapshot {
        let mut total = StatsSnapshot::default();
        for vehicle in &self.vehicles {
            total.accumulate(&vehicle.agent().stats());
        }
        total
    }

    pub fn vehicles(&self) -> &[SimVehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, idx: usize) -> Option<&SimVehicle> {
        self.vehicles.get(idx)
    }

    pub fn links(&self) -> &Arc<LinkController> {
        &self.links
    }

    /// Returns the current simulation time.
    pub fn now(&self) -> Duration {
        self.context.now()
    }

    /// Returns the current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.now().as_secs_f64()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Number of push rounds run so far.
    pub fn push_count(&self) -> u64 {
        self.push_count
    }

    pub fn agent_count(&self) -> usize {
        self.vehicles.len()
    }
}
