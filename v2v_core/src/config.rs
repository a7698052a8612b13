//! Tunable parameters of the relay.

use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a relay agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Agent's logical name (for logging)
    pub name: String,

    /// Proximity radius for peer discovery, in length units (default: 1000)
    pub broadcast_radius: f64,

    /// Maximum record age before eviction, in seconds (default: 20)
    pub staleness_threshold_secs: f64,

    /// Full-sync period, in seconds (default: 1)
    pub push_interval_secs: f64,

    /// Hop budget given to a fresh flood wave (default: 3)
    pub max_hop_budget: u8,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            name: "v2v-agent".to_string(),
            broadcast_radius: 1000.0,
            staleness_threshold_secs: 20.0,
            push_interval_secs: 1.0,
            max_hop_budget: 3,
        }
    }
}

impl RelayConfig {
    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, RelayError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), RelayError> {
        if !self.broadcast_radius.is_finite() || self.broadcast_radius <= 0.0 {
            return Err(RelayError::invalid_config(format!(
                "broadcast_radius must be positive, got {}",
                self.broadcast_radius
            )));
        }
        check_period("staleness_threshold_secs", self.staleness_threshold_secs)?;
        check_period("push_interval_secs", self.push_interval_secs)?;
        Ok(())
    }

    /// Staleness threshold as a duration. Call [`RelayConfig::validate`] first.
    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_secs_f64(self.staleness_threshold_secs)
    }

    /// Push period as a duration. Call [`RelayConfig::validate`] first.
    pub fn push_interval(&self) -> Duration {
        Duration::from_secs_f64(self.push_interval_secs)
    }
}

/// A period must be positive and representable as a [`Duration`].
fn check_period(field: &str, secs: f64) -> Result<(), RelayError> {
    match Duration::try_from_secs_f64(secs) {
        Ok(period) if !period.is_zero() => Ok(()),
        _ => Err(RelayError::invalid_config(format!(
            "{field} must be a positive duration, got {secs}"
        ))),
    }
}
