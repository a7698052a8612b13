//! V2V Relay Deterministic Simulation Harness
//!
//! This crate provides a controlled street where vehicles carrying relay
//! agents sense walkers and spread what they see, deterministically.
//!
//! # Core Principle: Everything Derives From One Seed
//!
//! - **Time**: a virtual clock advanced frame by frame
//! - **Radio**: a proximity index with injectable partitions
//! - **Randomness**: walker layout and sensor noise from seeded ChaCha8
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (virtual clock) + IntervalTimer (pushes)  │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │                        │                            │
//! │  ┌────▼─────┐  ProximityIndex ┌────▼─────┐                  │
//! │  │SimVehicle│◄───────────────►│SimVehicle│     ...          │
//! │  │ + sensor │  LinkController │ + sensor │                  │
//! │  └──────────┘                 └──────────┘                  │
//! │       ▲                        ▲                            │
//! │  ┌────┴────────────────────────┴────┐                       │
//! │  │            Oracle                 │                       │
//! │  │     (ground-truth walkers)        │                       │
//! │  └───────────────────────────────────┘                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use v2v_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42, 6).run(ScenarioId::Partition);
//! assert!(result.passed);
//! ```

mod agent;
mod context;
mod exporter;
mod network;
mod oracle;
mod runner;
pub mod scenarios;
mod sensor;
mod topology;
mod world;

pub use agent::SimVehicle;
pub use context::SimContext;
pub use exporter::{EntityPosition, SimEvent, SimExport, SimFrame, VehicleFrame};
pub use network::{LinkController, ProximityIndex};
pub use oracle::{Oracle, Walker};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use sensor::{ProximitySensor, SensorModel, SweepSensor};
pub use topology::FixedTopology;
pub use world::{SimConfig, SimWorld};
