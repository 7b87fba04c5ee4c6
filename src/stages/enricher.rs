//! Enrichment: attach the converted amount to validated trades.

use crate::error::PipelineError;
use crate::models::{Trade, TradeStatus};
use crate::stages::{StageKind, TradeProcessor};

#[derive(Debug, Default)]
pub struct Enricher;

impl Enricher {
    pub fn new() -> Self {
        Self
    }
}

impl TradeProcessor for Enricher {
    fn stage(&self) -> StageKind {
        StageKind::Enricher
    }

    fn process(&mut self, trade: Trade) -> Result<Option<Trade>, PipelineError> {
        match trade.status() {
            TradeStatus::Rejected => Ok(Some(trade)),
            _ => trade.enriched().map(Some),
        }
    }
}
