//! Vehicle-mounted walker sensors.
//!
//! Two models are available:
//! - [`SweepSensor`]: a single beam rotating about the vertical axis. Each
//!   frame it covers the arc swept since the previous frame and reports the
//!   nearest walker inside that arc, like a line trace that stops at its
//!   first hit.
//! - [`ProximitySensor`]: reports every walker inside a sphere.
//!
//! Sensors only ever see walkers, so the owning vehicle never detects itself.

use serde::{Deserialize, Serialize};
use v2v_core::{Position, SubjectId};

/// Default beam length.
pub const DEFAULT_TRACE_RANGE: f64 = 1000.0;

/// Default sphere radius.
pub const DEFAULT_SAFE_DISTANCE_RADIUS: f64 = 500.0;

/// Beam angular speed.
pub const SWEEP_DEGREES_PER_SEC: f64 = 360.0;

/// Rotating single-beam sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSensor {
    /// Beam length
    pub trace_range: f64,

    /// Current beam heading in degrees, in `[0, 360)`
    heading_deg: f64,
}

impl SweepSensor {
    pub fn new(trace_range: f64) -> Self {
        Self {
            trace_range,
            heading_deg: 0.0,
        }
    }

    pub fn heading_deg(&self) -> f64 {
        self.heading_deg
    }

    /// Sweeps the beam for one frame of `dt` seconds.
    pub fn sense(
        &mut self,
        origin: &Position,
        walkers: &[(SubjectId, Position)],
        dt: f64,
    ) -> Vec<SubjectId> {
        let arc = (dt * SWEEP_DEGREES_PER_SEC).clamp(0.0, 360.0);
        let start = self.heading_deg;

        let hit = walkers
            .iter()
            .filter_map(|(id, position)| {
                let offset = position - origin;
                let distance = offset.norm();
                if distance > self.trace_range {
                    return None;
                }
                let bearing = offset.y.atan2(offset.x).to_degrees().rem_euclid(360.0);
                // rem_euclid of a tiny negative rounds up to 360.0
                let into_arc = match (bearing - start).rem_euclid(360.0) {
                    a if a >= 360.0 => 0.0,
                    a => a,
                };
                (into_arc < arc || arc >= 360.0).then_some((*id, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id);

        self.heading_deg = (start + arc).rem_euclid(360.0);

        hit.into_iter().collect()
    }
}

impl Default for SweepSensor {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_RANGE)
    }
}

/// Sphere-overlap sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximitySensor {
    pub safe_distance_radius: f64,
}

impl ProximitySensor {
    pub fn new(safe_distance_radius: f64) -> Self {
        Self {
            safe_distance_radius,
        }
    }

    /// Reports every walker inside the sphere.
    pub fn sense(&self, origin: &Position, walkers: &[(SubjectId, Position)]) -> Vec<SubjectId> {
        walkers
            .iter()
            .filter(|(_, position)| (position - origin).norm() <= self.safe_distance_radius)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl Default for ProximitySensor {
    fn default() -> Self {
        Self::new(DEFAULT_SAFE_DISTANCE_RADIUS)
    }
}

/// Sensor fitted to a simulated vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SensorModel {
    Sweep(SweepSensor),
    Proximity(ProximitySensor),
}

impl SensorModel {
    pub fn sweep(trace_range: f64) -> Self {
        Self::Sweep(SweepSensor::new(trace_range))
    }

    pub fn proximity(radius: f64) -> Self {
        Self::Proximity(ProximitySensor::new(radius))
    }

    /// Runs the sensor for one frame.
    pub fn sense(
        &mut self,
        origin: &Position,
        walkers: &[(SubjectId, Position)],
        dt: f64,
    ) -> Vec<SubjectId> {
        match self {
            Self::Sweep(sensor) => sensor.sense(origin, walkers, dt),
            Self::Proximity(sensor) => sensor.sense(origin, walkers),
        }
    }
}
