//! Per-agent relay counters for telemetry collaborators.

use crate::gossip::FloodReport;
use crate::ingest::IngestOutcome;
use crate::pusher::PushReport;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters, safe to read while the agent runs.
#[derive(Debug, Default)]
pub struct RelayStats {
    detections_accepted: AtomicU64,
    detections_stale: AtomicU64,
    detections_rejected: AtomicU64,
    flood_waves: AtomicU64,
    flood_offered: AtomicU64,
    flood_accepted: AtomicU64,
    push_ticks: AtomicU64,
    push_offered: AtomicU64,
    push_accepted: AtomicU64,
    records_expired: AtomicU64,
}

/// Point-in-time copy of [`RelayStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub detections_accepted: u64,
    pub detections_stale: u64,
    pub detections_rejected: u64,
    pub flood_waves: u64,
    pub flood_offered: u64,
    pub flood_accepted: u64,
    pub push_ticks: u64,
    pub push_offered: u64,
    pub push_accepted: u64,
    pub records_expired: u64,
}

impl StatsSnapshot {
    /// Total cross-agent upserts this agent initiated.
    pub fn upserts_sent(&self) -> u64 {
        self.flood_offered + self.push_offered
    }

    /// Adds another snapshot field by field.
    pub fn accumulate(&mut self, other: &StatsSnapshot) {
        self.detections_accepted += other.detections_accepted;
        self.detections_stale += other.detections_stale;
        self.detections_rejected += other.detections_rejected;
        self.flood_waves += other.flood_waves;
        self.flood_offered += other.flood_offered;
        self.flood_accepted += other.flood_accepted;
        self.push_ticks += other.push_ticks;
        self.push_offered += other.push_offered;
        self.push_accepted += other.push_accepted;
        self.records_expired += other.records_expired;
    }
}

impl RelayStats {
    pub fn record_ingest(&self, outcome: &IngestOutcome) {
        let counter = match outcome {
            IngestOutcome::Accepted(_) => &self.detections_accepted,
            IngestOutcome::Stale => &self.detections_stale,
            IngestOutcome::Rejected(_) => &self.detections_rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flood(&self, report: &FloodReport) {
        self.flood_waves.fetch_add(1, Ordering::Relaxed);
        self.flood_offered.fetch_add(report.offered, Ordering::Relaxed);
        self.flood_accepted.fetch_add(report.accepted, Ordering::Relaxed);
    }

    pub fn record_push(&self, report: &PushReport) {
        self.push_ticks.fetch_add(1, Ordering::Relaxed);
        self.push_offered.fetch_add(report.offered, Ordering::Relaxed);
        self.push_accepted.fetch_add(report.accepted, Ordering::Relaxed);
    }

    pub fn record_expired(&self, count: usize) {
        self.records_expired.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            detections_accepted: self.detections_accepted.load(Ordering::Relaxed),
            detections_stale: self.detections_stale.load(Ordering::Relaxed),
            detections_rejected: self.detections_rejected.load(Ordering::Relaxed),
            flood_waves: self.flood_waves.load(Ordering::Relaxed),
            flood_offered: self.flood_offered.load(Ordering::Relaxed),
            flood_accepted: self.flood_accepted.load(Ordering::Relaxed),
            push_ticks: self.push_ticks.load(Ordering::Relaxed),
            push_offered: self.push_offered.load(Ordering::Relaxed),
            push_accepted: self.push_accepted.load(Ordering::Relaxed),
            records_expired: self.records_expired.load(Ordering::Relaxed),
        }
    }
}
