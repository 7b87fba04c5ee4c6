//! Pipeline statistics
//!
//! Lock-free counters shared by every stage worker. Readers take a
//! [`PipelineStatsSnapshot`] for reporting.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::TradeStatus;

/// Statistics for pipeline execution
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Trades synthesized and pushed by the producer
    pub trades_produced: AtomicU64,
    /// Trades that passed validation
    pub trades_validated: AtomicU64,
    /// Trades rejected by validation
    pub trades_rejected: AtomicU64,
    pub trades_enriched: AtomicU64,
    pub trades_settled: AtomicU64,
    /// Trades recorded by the terminal audit stage (including rejected ones)
    pub trades_audited: AtomicU64,
    /// Blocking operations woken by stop()
    pub interruptions: AtomicU64,
    /// Ticks that panicked or failed with a non-cancellation error
    pub tick_failures: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_produced(&self) {
        self.trades_produced.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a trade leaving a processing stage with `status`
    pub fn record_status(&self, status: TradeStatus) {
        let counter = match status {
            TradeStatus::New => &self.trades_produced,
            TradeStatus::Validated => &self.trades_validated,
            TradeStatus::Rejected => &self.trades_rejected,
            TradeStatus::Enriched => &self.trades_enriched,
            TradeStatus::Settled => &self.trades_settled,
            TradeStatus::Audited => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_audited(&self) {
        self.trades_audited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_interrupted(&self) {
        self.interruptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_tick_failure(&self) {
        self.tick_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats
    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            trades_produced: self.trades_produced.load(Ordering::Relaxed),
            trades_validated: self.trades_validated.load(Ordering::Relaxed),
            trades_rejected: self.trades_rejected.load(Ordering::Relaxed),
            trades_enriched: self.trades_enriched.load(Ordering::Relaxed),
            trades_settled: self.trades_settled.load(Ordering::Relaxed),
            trades_audited: self.trades_audited.load(Ordering::Relaxed),
            interruptions: self.interruptions.load(Ordering::Relaxed),
            tick_failures: self.tick_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of stats (for reporting)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PipelineStatsSnapshot {
    pub trades_produced: u64,
    pub trades_validated: u64,
    pub trades_rejected: u64,
    pub trades_enriched: u64,
    pub trades_settled: u64,
    pub trades_audited: u64,
    pub interruptions: u64,
    pub tick_failures: u64,
}

impl std::fmt::Display for PipelineStatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pipeline Stats: produced={}, validated={}, rejected={}, enriched={}, settled={}, audited={}, interrupted={}, failures={}",
            self.trades_produced,
            self.trades_validated,
            self.trades_rejected,
            self.trades_enriched,
            self.trades_settled,
            self.trades_audited,
            self.interruptions,
            self.tick_failures
        )
    }
}
