//! V2V Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction allowing the relay core
//! to run in both **Production** (tokio) and **Simulation** (virtual clock)
//! environments.
//!
//! # Core Concept: Injected Scheduling
//!
//! The dissemination core never owns a timer or a frame loop. The host
//! supplies:
//! - Time (`now()`, `sleep()`) through [`RelayContext`]
//! - Fixed-period callbacks through [`IntervalTimer`]
//! - Stable identities for agents and subjects ([`AgentId`], [`SubjectId`])
//!
//! By deriving all simulated entropy from a single 64-bit seed, any
//! dissemination bug becomes reproducible via its seed number.
//!
//! # Example
//!
//! ```ignore
//! use v2v_env::{RelayContext, IntervalTimer};
//!
//! async fn push_loop<Ctx: RelayContext>(ctx: &Ctx) {
//!     let mut timer = IntervalTimer::new(Duration::from_secs(1))?;
//!     loop {
//!         ctx.sleep(Duration::from_millis(33)).await;
//!         if timer.poll(ctx.now()) {
//!             push_tick();
//!         }
//!     }
//! }
//! ```

mod context;
mod types;
mod error;
mod timer;
mod tokio_impl;

pub use context::RelayContext;
pub use types::{AgentId, SubjectId};
pub use error::EnvError;
pub use timer::IntervalTimer;
pub use tokio_impl::TokioContext;
