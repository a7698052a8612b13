//! SimVehicle - A wrapper that runs a RelayAgent in simulation.
//!
//! This module bridges `v2v_core::RelayAgent` with the simulation
//! infrastructure, providing:
//! - Constant-velocity motion
//! - Sensing walkers from the Oracle and feeding the ingestor

use crate::oracle::Oracle;
use crate::sensor::SensorModel;

use nalgebra::Vector3;
use std::time::Duration;
use v2v_core::{AgentId, Position, RelayAgent, SubjectId};

/// A simulated vehicle carrying a relay agent and a walker sensor.
pub struct SimVehicle {
    /// The underlying relay agent
    inner: RelayAgent,

    /// Velocity in length units per second
    velocity: Vector3<f64>,

    /// Fitted sensor
    sensor: SensorModel,

    /// Index in the world's vehicle list
    index: usize,
}

impl SimVehicle {
    /// Wraps `inner` with motion and a sensor.
    pub fn new(inner: RelayAgent, velocity: Vector3<f64>, sensor: SensorModel, index: usize) -> Self {
        Self {
            inner,
            velocity,
            sensor,
            index,
        }
    }

    /// Returns the vehicle's agent id.
    pub fn id(&self) -> AgentId {
        self.inner.id
    }

    /// Current position.
    pub fn position(&self) -> Position {
        self.inner.position()
    }

    /// Moves the vehicle by one frame.
    pub fn step(&mut self, dt: f64) {
        let next = self.inner.position() + self.velocity * dt;
        self.inner.set_position(next);
    }

    /// Runs the sensor for one frame and ingests what it saw.
    ///
    /// Returns the number of detections that changed the store.
    pub fn sense(
        &mut self,
        oracle: &mut Oracle,
        truth: &[(SubjectId, Position)],
        dt: f64,
        now: Duration,
    ) -> usize {
        let origin = self.inner.position();
        let seen = self.sensor.sense(&origin, truth, dt);

        let mut accepted = 0;
        for subject in seen {
            let Some(observed) = oracle.observe(subject) else {
                continue;
            };
            if self.inner.on_detected(subject, observed, now).accepted().is_some() {
                accepted += 1;
            }
        }
        accepted
    }

    /// Returns a reference to the inner agent.
    pub fn agent(&self) -> &RelayAgent {
        &self.inner
    }

    /// Fitted sensor.
    pub fn sensor(&self) -> &SensorModel {
        &self.sensor
    }

    /// Index in the world's vehicle list.
    pub fn index(&self) -> usize {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use v2v_core::{NoNeighbors, RelayConfig};

    fn vehicle(sensor: SensorModel) -> SimVehicle {
        let agent = RelayAgent::new(
            AgentId::from_seed(0),
            RelayConfig::default(),
            Arc::new(NoNeighbors),
        )
        .unwrap();
        SimVehicle::new(agent, Vector3::new(10.0, 0.0, 0.0), sensor, 0)
    }

    #[test]
    fn test_step_moves_agent() {
        let mut v = vehicle(SensorModel::proximity(500.0));

        v.step(0.5);

        assert_eq!(v.position(), Position::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_sense_ingests_local_detections() {
        let mut oracle = Oracle::new(1);
        let near = oracle.spawn_walker(Vector3::new(100.0, 0.0, 0.0), Vector3::zeros());
        let far = oracle.spawn_walker(Vector3::new(900.0, 0.0, 0.0), Vector3::zeros());
        let mut v = vehicle(SensorModel::proximity(500.0));

        let truth = oracle.ground_truth();
        let accepted = v.sense(&mut oracle, &truth, 1.0 / 30.0, Duration::from_secs(1));

        assert_eq!(accepted, 1);
        let record = v.agent().store().get(near).unwrap();
        assert!(record.observed_locally);
        assert!(v.agent().store().get(far).is_none());
    }
}
