//! V2V Relay Core - Coordinator-free Detection Dissemination
//!
//! This library spreads short-lived, locally sensed detections ("pedestrian
//! seen at P at time T") between mobile agents that can only talk to peers
//! inside a proximity radius. It solves four problems without a coordinator:
//! 1. **Peer discovery**: a fresh neighbor query every dissemination cycle
//! 2. **Merging**: newest-timestamp-wins with a sticky first-hand flag
//! 3. **Bounded flooding**: hop-budgeted breadth-first relay with a visited set
//! 4. **Eviction**: records older than the staleness threshold are reaped
//!
//! # Pipeline
//!
//! ```text
//!  sensing host ──► DetectionIngestor ──► LocalStore ◄── Reaper (every cycle)
//!                          │                  │
//!                   accepted upsert      snapshot (every push interval)
//!                          ▼                  ▼
//!                 GossipDisseminator    PeriodicPusher
//!                  (multi-hop flood)   (single-hop sync)
//!                          │                  │
//!                          └──► NeighborFinder ──► peer.store().upsert()
//! ```

pub mod agent_runtime;
pub mod config;
pub mod error;
pub mod gossip;
pub mod ingest;
pub mod neighbors;
pub mod pusher;
pub mod reaper;
pub mod record;
pub mod stats;
pub mod store;

#[cfg(test)]
mod test_support;

// Re-export key types for convenience
pub use agent_runtime::RelayAgent;
pub use config::RelayConfig;
pub use error::RelayError;
pub use gossip::{FloodReport, FloodSource, GossipDisseminator};
pub use ingest::{DetectionIngestor, IngestOutcome, RejectReason};
pub use neighbors::{NeighborFinder, NoNeighbors, PeerHandle, PeerStore};
pub use pusher::{PeriodicPusher, PushReport};
pub use reaper::Reaper;
pub use record::{DetectionRecord, Position};
pub use stats::{RelayStats, StatsSnapshot};
pub use store::{LocalStore, UpsertOutcome};
pub use v2v_env::{AgentId, SubjectId};
