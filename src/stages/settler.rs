//! Settlement: stamp enriched trades with their settlement time.

use chrono::Utc;

use crate::error::PipelineError;
use crate::models::{Trade, TradeStatus};
use crate::stages::{StageKind, TradeProcessor};

#[derive(Debug, Default)]
pub struct Settler;

impl Settler {
    pub fn new() -> Self {
        Self
    }
}

impl TradeProcessor for Settler {
    fn stage(&self) -> StageKind {
        StageKind::Settler
    }

    fn process(&mut self, trade: Trade) -> Result<Option<Trade>, PipelineError> {
        match trade.status() {
            TradeStatus::Rejected => Ok(Some(trade)),
            _ => trade.settled(Utc::now()).map(Some),
        }
    }
}
