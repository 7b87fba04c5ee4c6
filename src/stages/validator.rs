//! Trade validation
//!
//! NEW trades either become VALIDATED or REJECTED with a reason. Rejected
//! trades keep flowing so the audit trail records every trade produced.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::models::{Trade, TradeStatus};
use crate::stages::{StageKind, TradeProcessor};

#[derive(Debug, Default)]
pub struct Validator {
    rejected: u64,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// First violated rule, if any
    pub fn check(trade: &Trade) -> Option<String> {
        if trade.units() == 0 {
            return Some("units must be positive".to_string());
        }
        if trade.amount() <= Decimal::ZERO {
            return Some(format!("amount must be positive, got {}", trade.amount()));
        }
        if trade.rate() <= Decimal::ZERO {
            return Some(format!("rate must be positive, got {}", trade.rate()));
        }
        for code in [trade.from_currency(), trade.to_currency()] {
            if !is_currency_code(code) {
                return Some(format!("invalid currency code '{code}'"));
            }
        }
        if trade.from_currency() == trade.to_currency() {
            return Some(format!(
                "source and destination currency are both {}",
                trade.from_currency()
            ));
        }
        None
    }
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

impl TradeProcessor for Validator {
    fn stage(&self) -> StageKind {
        StageKind::Validator
    }

    fn process(&mut self, trade: Trade) -> Result<Option<Trade>, PipelineError> {
        if trade.status() != TradeStatus::New {
            return Err(PipelineError::InvalidTransition {
                trade_id: trade.id().to_string(),
                from: trade.status(),
                to: TradeStatus::Validated,
            });
        }

        match Self::check(&trade) {
            None => trade.validated().map(Some),
            Some(reason) => {
                self.rejected += 1;
                if self.rejected % 1000 == 1 {
                    info!(rejected_total = self.rejected, reason = %reason, "Trades rejected by validation");
                }
                debug!(trade_id = trade.id(), reason = %reason, "Trade rejected");
                trade.rejected(reason).map(Some)
            }
        }
    }
}
