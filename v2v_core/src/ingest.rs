//! First-hand detection adapter.
//!
//! The only entry point for ground truth: every other upsert in the system
//! relays data that originated here on some agent.

use crate::record::{DetectionRecord, Position};
use crate::store::{LocalStore, UpsertOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use v2v_env::SubjectId;

/// Why a sensing event never reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The sensor saw the agent's own body
    SelfDetection,

    /// At least one coordinate is NaN or infinite
    NonFinitePosition,
}

/// Result of feeding one sensing event into the store.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// The store changed; carries the record as now stored
    Accepted(DetectionRecord),

    /// A report at least as new was already stored
    Stale,

    /// Filtered before reaching the store
    Rejected(RejectReason),
}

impl IngestOutcome {
    /// The accepted record, if any.
    pub fn accepted(&self) -> Option<&DetectionRecord> {
        match self {
            IngestOutcome::Accepted(record) => Some(record),
            _ => None,
        }
    }
}

/// Turns sensing events into first-hand upserts on one store.
#[derive(Debug, Clone)]
pub struct DetectionIngestor {
    store: Arc<LocalStore>,

    /// Subject id of the vehicle carrying the sensor, if it has one
    self_subject: Option<SubjectId>,
}

impl DetectionIngestor {
    /// Creates an ingestor writing into `store`.
    pub fn new(store: Arc<LocalStore>, self_subject: Option<SubjectId>) -> Self {
        Self {
            store,
            self_subject,
        }
    }

    /// Records that this agent directly observed `subject` at `position`.
    pub fn on_detected(
        &self,
        subject: SubjectId,
        position: Position,
        now: Duration,
    ) -> IngestOutcome {
        if self.self_subject == Some(subject) {
            debug!(owner = %self.store.owner(), %subject, "ignoring self detection");
            return IngestOutcome::Rejected(RejectReason::SelfDetection);
        }

        if !position.iter().all(|c| c.is_finite()) {
            warn!(owner = %self.store.owner(), %subject, "dropping detection with non-finite position");
            return IngestOutcome::Rejected(RejectReason::NonFinitePosition);
        }

        match self.store.merge(subject, position, now, true) {
            UpsertOutcome::Stale => IngestOutcome::Stale,
            UpsertOutcome::Inserted | UpsertOutcome::Updated => {
                IngestOutcome::Accepted(DetectionRecord::new(subject, position, now, true))
            }
        }
    }

    /// Subject id treated as the agent itself.
    pub fn self_subject(&self) -> Option<SubjectId> {
        self.self_subject
    }
}
