//! Errors raised while setting up or driving a relay agent.
//!
//! The dissemination path itself never fails: stale reports, empty
//! neighbor sets and filtered detections are ordinary outcomes.

use thiserror::Error;
use v2v_env::EnvError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Scheduling error: {0}")]
    Schedule(#[from] EnvError),
}

impl RelayError {
    /// Creates an invalid-configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
