//! Ground truth oracle for simulation.
//!
//! The Oracle maintains the "God's eye view" of the simulated street:
//! - True positions of all walkers
//! - Constant-velocity kinematics
//! - Noisy observations handed to vehicle sensors

use nalgebra::Vector3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use v2v_core::{Position, SubjectId};

/// A ground truth walker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Walker {
    /// Stable subject id
    pub id: SubjectId,

    /// Position in the world frame
    pub position: Vector3<f64>,

    /// Velocity in length units per second
    pub velocity: Vector3<f64>,

    /// Walker is still in the world
    pub active: bool,
}

/// The Oracle - maintains ground truth and generates observations.
pub struct Oracle {
    /// RNG for sensor noise
    physics_rng: ChaCha8Rng,

    /// Walkers keyed by id (ordered so iteration is reproducible)
    walkers: BTreeMap<SubjectId, Walker>,

    /// Next walker id
    next_id: u64,

    /// Current simulation time (seconds)
    current_time: f64,

    /// Position noise standard deviation
    position_noise_std: f64,
}

impl Oracle {
    /// Creates a new Oracle with the given physics seed.
    ///
    /// The physics seed should be derived separately from the layout seed
    /// so that adding vehicles doesn't change walker noise.
    pub fn new(physics_seed: u64) -> Self {
        Self {
            physics_rng: ChaCha8Rng::seed_from_u64(physics_seed),
            walkers: BTreeMap::new(),
            next_id: 0,
            current_time: 0.0,
            position_noise_std: 0.0,
        }
    }

    /// Sets the position noise standard deviation (negative values clamp to 0).
    pub fn set_position_noise(&mut self, std_dev: f64) {
        self.position_noise_std = std_dev.max(0.0);
    }

    /// Spawns a walker and returns its id.
    pub fn spawn_walker(&mut self, position: Vector3<f64>, velocity: Vector3<f64>) -> SubjectId {
        let id = SubjectId(self.next_id);
        self.next_id += 1;

        self.walkers.insert(
            id,
            Walker {
                id,
                position,
                velocity,
                active: true,
            },
        );

        id
    }

    /// Removes a walker from the world.
    pub fn remove_walker(&mut self, id: SubjectId) {
        if let Some(walker) = self.walkers.get_mut(&id) {
            walker.active = false;
        }
    }

    /// Advances physics by dt seconds.
    pub fn step(&mut self, dt: f64) {
        self.current_time += dt;

        for walker in self.walkers.values_mut().filter(|w| w.active) {
            walker.position += walker.velocity * dt;
        }
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.current_time
    }

    /// Returns a specific walker by id.
    pub fn walker(&self, id: SubjectId) -> Option<&Walker> {
        self.walkers.get(&id)
    }

    /// Returns the number of active walkers.
    pub fn active_count(&self) -> usize {
        self.walkers.values().filter(|w| w.active).count()
    }

    /// Returns true positions of all active walkers, ordered by id.
    pub fn ground_truth(&self) -> Vec<(SubjectId, Position)> {
        self.walkers
            .values()
            .filter(|w| w.active)
            .map(|w| (w.id, w.position))
            .collect()
    }

    /// Generates a noisy observation of one walker.
    pub fn observe(&mut self, id: SubjectId) -> Option<Position> {
        let walker = self.walkers.get(&id).filter(|w| w.active)?;
        let position = walker.position;

        if self.position_noise_std == 0.0 {
            return Some(position);
        }

        let normal = Normal::new(0.0, self.position_noise_std).ok()?;
        let noise = Vector3::new(
            normal.sample(&mut self.physics_rng),
            normal.sample(&mut self.physics_rng),
            normal.sample(&mut self.physics_rng),
        );

        Some(position + noise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_spawn_walker() {
        let mut oracle = Oracle::new(42);

        let id = oracle.spawn_walker(Vector3::new(100.0, 200.0, 0.0), Vector3::zeros());

        let walker = oracle.walker(id).unwrap();
        assert_eq!(walker.position.x, 100.0);
        assert_eq!(oracle.active_count(), 1);
    }

    #[test]
    fn test_oracle_physics_step() {
        let mut oracle = Oracle::new(42);

        let id = oracle.spawn_walker(Vector3::zeros(), Vector3::new(1.5, 0.0, 0.0));

        oracle.step(2.0);

        let walker = oracle.walker(id).unwrap();
        assert!((walker.position.x - 3.0).abs() < 1e-9);
        assert!((oracle.time() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_removed_walker_is_not_observed() {
        let mut oracle = Oracle::new(42);
        let id = oracle.spawn_walker(Vector3::zeros(), Vector3::zeros());

        oracle.remove_walker(id);

        assert!(oracle.observe(id).is_none());
        assert!(oracle.ground_truth().is_empty());
    }

    #[test]
    fn test_oracle_deterministic_noise() {
        let mut oracle1 = Oracle::new(42);
        let mut oracle2 = Oracle::new(42);
        oracle1.set_position_noise(0.5);
        oracle2.set_position_noise(0.5);

        let id1 = oracle1.spawn_walker(Vector3::zeros(), Vector3::zeros());
        let id2 = oracle2.spawn_walker(Vector3::zeros(), Vector3::zeros());

        let reading1 = oracle1.observe(id1).unwrap();
        let reading2 = oracle2.observe(id2).unwrap();

        // Same seed = same noise
        assert_eq!(reading1, reading2);
        assert_ne!(reading1, Vector3::zeros());
    }
}
