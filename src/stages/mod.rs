//! Pipeline stages
//!
//! ```text
//! Producer ─▶ [trades] ─▶ Validator ─▶ [validated] ─▶ Enricher ─▶ [enriched] ─▶ Settler ─▶ [settled] ─▶ Auditor
//! ```
//!
//! The producer runs on a fixed-rate schedule. Every downstream stage is a
//! [`TradeProcessor`] wrapped in a [`ProcessorTask`] that pops, processes and
//! forwards one trade per tick.

pub mod auditor;
pub mod enricher;
pub mod producer;
pub mod settler;
pub mod validator;

pub use auditor::{AuditRecord, AuditSummary, AuditTrail, Auditor};
pub use enricher::Enricher;
pub use producer::{ProducerTask, TradeSynthesizer};
pub use settler::Settler;
pub use validator::Validator;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cancel::CancelToken;
use crate::channel::BoundedChannel;
use crate::error::PipelineError;
use crate::models::Trade;
use crate::stats::PipelineStats;
use crate::worker::StageTask;

/// Identifies a stage; `ALL` is the fixed start/stop order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Producer,
    Validator,
    Enricher,
    Settler,
    Auditor,
}

impl StageKind {
    pub const ALL: [StageKind; 5] = [
        StageKind::Producer,
        StageKind::Validator,
        StageKind::Enricher,
        StageKind::Settler,
        StageKind::Auditor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Producer => "producer",
            StageKind::Validator => "validator",
            StageKind::Enricher => "enricher",
            StageKind::Settler => "settler",
            StageKind::Auditor => "auditor",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One trade in, at most one trade out
pub trait TradeProcessor: Send + 'static {
    fn stage(&self) -> StageKind;

    /// `Some` is forwarded downstream, `None` ends the trade's journey.
    fn process(&mut self, trade: Trade) -> Result<Option<Trade>, PipelineError>;
}

/// Drives a [`TradeProcessor`] between two channels
pub struct ProcessorTask<P> {
    processor: P,
    input: Arc<BoundedChannel<Trade>>,
    output: Option<Arc<BoundedChannel<Trade>>>,
    stats: Arc<PipelineStats>,
}

impl<P: TradeProcessor> ProcessorTask<P> {
    pub fn new(
        processor: P,
        input: Arc<BoundedChannel<Trade>>,
        output: Option<Arc<BoundedChannel<Trade>>>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            processor,
            input,
            output,
            stats,
        }
    }
}

impl<P: TradeProcessor> StageTask for ProcessorTask<P> {
    fn tick(&mut self, cancel: &CancelToken) -> Result<(), PipelineError> {
        let stage = self.processor.stage().name();
        let trade = self
            .input
            .pop(cancel)
            .map_err(|_| PipelineError::Interrupted { stage })?;
        let status_in = trade.status();

        let Some(out) = self.processor.process(trade)? else {
            self.stats.incr_audited();
            return Ok(());
        };

        if out.status() != status_in {
            self.stats.record_status(out.status());
        }
        debug!(stage, trade_id = out.id(), status = %out.status(), "Trade processed");

        match &self.output {
            Some(output) => output
                .push(out, cancel)
                .map_err(|_| PipelineError::Interrupted { stage }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::models::Trade;

    /// A trade that passes every validation rule
    pub(crate) fn valid_trade(id: &str) -> Trade {
        Trade::new(
            id.to_string(),
            "acc-1".to_string(),
            "broker-1".to_string(),
            "USD",
            "EUR",
            10,
            Decimal::new(150_000, 2),
            Decimal::new(92, 2),
            Utc::now(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::valid_trade;
    use super::*;
    use crate::models::TradeStatus;

    #[test]
    fn test_stage_order() {
        let names: Vec<_> = StageKind::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["producer", "validator", "enricher", "settler", "auditor"]
        );
    }

    #[test]
    fn test_processor_task_forwards_and_counts() {
        let input = Arc::new(BoundedChannel::new("in", 4).unwrap());
        let output = Arc::new(BoundedChannel::new("out", 4).unwrap());
        let stats = Arc::new(PipelineStats::new());
        let mut task = ProcessorTask::new(
            Validator::new(),
            input.clone(),
            Some(output.clone()),
            stats.clone(),
        );

        let token = CancelToken::new();
        input.push(valid_trade("t-1"), &token).unwrap();
        task.tick(&token).unwrap();

        let out = output.pop(&token).unwrap();
        assert_eq!(out.id(), "t-1");
        assert_eq!(out.status(), TradeStatus::Validated);
        assert_eq!(stats.snapshot().trades_validated, 1);
    }

    #[test]
    fn test_processor_task_interrupted_on_cancel() {
        let input: Arc<BoundedChannel<Trade>> = Arc::new(BoundedChannel::new("in", 4).unwrap());
        let stats = Arc::new(PipelineStats::new());
        let mut task = ProcessorTask::new(Validator::new(), input, None, stats);

        let token = CancelToken::new();
        token.cancel();
        let err = task.tick(&token).unwrap_err();
        assert!(err.is_interrupted());
    }
}
