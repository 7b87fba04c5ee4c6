//! Auditor - terminal stage
//!
//! Settled trades are marked AUDITED, rejected trades are recorded as they
//! are. Both land in the shared [`AuditTrail`], which keeps the most recent
//! records plus running totals.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::PipelineError;
use crate::models::{Trade, TradeStatus};
use crate::stages::{StageKind, TradeProcessor};

pub const DEFAULT_AUDIT_TRAIL_LEN: usize = 1000;

/// A trade that reached the end of the pipeline
pub type AuditRecord = Trade;

/// Totals reported by the audit trail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuditSummary {
    pub audited: u64,
    pub rejected: u64,
    /// Records currently retained (at most the trail length)
    pub retained: usize,
}

#[derive(Debug, Default)]
struct TrailState {
    records: VecDeque<AuditRecord>,
    audited: u64,
    rejected: u64,
}

/// Bounded in-memory audit log shared by both pipeline modes
#[derive(Debug)]
pub struct AuditTrail {
    max_len: usize,
    state: Mutex<TrailState>,
}

impl AuditTrail {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            state: Mutex::new(TrailState {
                records: VecDeque::with_capacity(max_len.min(1024)),
                ..Default::default()
            }),
        }
    }

    pub fn record(&self, trade: AuditRecord) {
        let mut state = self.state.lock();
        match trade.status() {
            TradeStatus::Rejected => state.rejected += 1,
            _ => state.audited += 1,
        }
        if self.max_len == 0 {
            return;
        }
        if state.records.len() == self.max_len {
            state.records.pop_front();
        }
        state.records.push_back(trade);
    }

    pub fn summary(&self) -> AuditSummary {
        let state = self.state.lock();
        AuditSummary {
            audited: state.audited,
            rejected: state.rejected,
            retained: state.records.len(),
        }
    }

    /// Up to `limit` most recent records, oldest first
    pub fn recent(&self, limit: usize) -> Vec<AuditRecord> {
        let state = self.state.lock();
        let skip = state.records.len().saturating_sub(limit);
        state.records.iter().skip(skip).cloned().collect()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_TRAIL_LEN)
    }
}

pub struct Auditor {
    trail: Arc<AuditTrail>,
}

impl Auditor {
    pub fn new(trail: Arc<AuditTrail>) -> Self {
        Self { trail }
    }
}

impl TradeProcessor for Auditor {
    fn stage(&self) -> StageKind {
        StageKind::Auditor
    }

    fn process(&mut self, trade: Trade) -> Result<Option<Trade>, PipelineError> {
        let record = match trade.status() {
            TradeStatus::Rejected => trade,
            _ => trade.audited()?,
        };
        debug!(trade_id = record.id(), status = %record.status(), "Trade audited");
        self.trail.record(record);

        let summary = self.trail.summary();
        let total = summary.audited + summary.rejected;
        if total % 1000 == 0 {
            info!(audited = summary.audited, rejected = summary.rejected, "Audit milestone");
        }
        Ok(None)
    }
}
