//! Trade producer
//!
//! Synthesizes one NEW trade per tick and pushes it into the trade channel,
//! blocking while the channel is full.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::channel::BoundedChannel;
use crate::core_types::CurrencyCode;
use crate::error::PipelineError;
use crate::models::{MONEY_SCALE, Trade};
use crate::stats::PipelineStats;
use crate::worker::StageTask;

/// Upper bound (exclusive) for synthesized unit counts
pub const MAX_UNITS: u32 = 1000;
/// Upper bound (exclusive) for synthesized amounts, in whole currency units
pub const MAX_AMOUNT: i64 = 10_000;

const SCALE_FACTOR: i64 = 10i64.pow(MONEY_SCALE);

/// Random trade generator for a fixed currency pair
#[derive(Debug)]
pub struct TradeSynthesizer {
    rng: StdRng,
    from_currency: CurrencyCode,
    to_currency: CurrencyCode,
}

impl TradeSynthesizer {
    pub fn new(from_currency: impl Into<CurrencyCode>, to_currency: impl Into<CurrencyCode>) -> Self {
        Self::with_rng(StdRng::from_entropy(), from_currency, to_currency)
    }

    /// Deterministic amounts for tests (ids are still random v4 UUIDs)
    pub fn with_seed(
        seed: u64,
        from_currency: impl Into<CurrencyCode>,
        to_currency: impl Into<CurrencyCode>,
    ) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), from_currency, to_currency)
    }

    fn with_rng(
        rng: StdRng,
        from_currency: impl Into<CurrencyCode>,
        to_currency: impl Into<CurrencyCode>,
    ) -> Self {
        Self {
            rng,
            from_currency: from_currency.into(),
            to_currency: to_currency.into(),
        }
    }

    /// Units in `[0, 1000)`, amount in `[0, 10000)`, rate in `[0, 1)`
    pub fn next_trade(&mut self) -> Trade {
        let units = self.rng.gen_range(0..MAX_UNITS);
        let amount = Decimal::new(self.rng.gen_range(0..MAX_AMOUNT * SCALE_FACTOR), MONEY_SCALE);
        let rate = Decimal::new(self.rng.gen_range(0..SCALE_FACTOR), MONEY_SCALE);

        Trade::new(
            Uuid::new_v4().to_string(),
            Uuid::new_v4().to_string(),
            Uuid::new_v4().to_string(),
            self.from_currency.clone(),
            self.to_currency.clone(),
            units,
            amount,
            rate,
            Utc::now(),
        )
    }
}

/// Fixed-rate producer tick: build one trade, then push it
pub struct ProducerTask {
    synthesizer: TradeSynthesizer,
    output: Arc<BoundedChannel<Trade>>,
    stats: Arc<PipelineStats>,
}

impl ProducerTask {
    pub fn new(
        synthesizer: TradeSynthesizer,
        output: Arc<BoundedChannel<Trade>>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            synthesizer,
            output,
            stats,
        }
    }
}

impl StageTask for ProducerTask {
    fn tick(&mut self, cancel: &CancelToken) -> Result<(), PipelineError> {
        let trade = self.synthesizer.next_trade();
        let trade_id = trade.id().to_string();

        self.output
            .push(trade, cancel)
            .map_err(|_| PipelineError::Interrupted { stage: "producer" })?;

        self.stats.incr_produced();
        debug!(trade_id = %trade_id, queue_depth = self.output.len(), "Trade produced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeStatus;

    #[test]
    fn test_synthesized_trade_ranges() {
        let mut synth = TradeSynthesizer::with_seed(7, "USD", "EUR");
        for _ in 0..500 {
            let trade = synth.next_trade();
            assert_eq!(trade.status(), TradeStatus::New);
            assert_eq!(trade.from_currency(), "USD");
            assert_eq!(trade.to_currency(), "EUR");
            assert!(trade.units() < MAX_UNITS);
            assert!(trade.amount() >= Decimal::ZERO);
            assert!(trade.amount() < Decimal::from(MAX_AMOUNT));
            assert!(trade.rate() >= Decimal::ZERO);
            assert!(trade.rate() < Decimal::ONE);
        }
    }

    #[test]
    fn test_synthesized_ids_distinct() {
        let mut synth = TradeSynthesizer::new("USD", "EUR");
        let a = synth.next_trade();
        let b = synth.next_trade();
        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id()).is_ok());
    }

    #[test]
    fn test_producer_tick_pushes_one_trade() {
        let output = Arc::new(BoundedChannel::new("trades", 4).unwrap());
        let stats = Arc::new(PipelineStats::new());
        let mut task = ProducerTask::new(
            TradeSynthesizer::with_seed(1, "USD", "EUR"),
            output.clone(),
            stats.clone(),
        );

        let token = CancelToken::new();
        task.tick(&token).unwrap();
        task.tick(&token).unwrap();

        assert_eq!(output.len(), 2);
        assert_eq!(stats.snapshot().trades_produced, 2);
    }

    #[test]
    fn test_producer_tick_interrupted_when_full() {
        let output = Arc::new(BoundedChannel::new("trades", 1).unwrap());
        let stats = Arc::new(PipelineStats::new());
        let mut task = ProducerTask::new(
            TradeSynthesizer::with_seed(1, "USD", "EUR"),
            output.clone(),
            stats.clone(),
        );

        let token = CancelToken::new();
        task.tick(&token).unwrap();
        token.cancel();

        let err = task.tick(&token).unwrap_err();
        assert!(err.is_interrupted());
        assert_eq!(output.len(), 1);
        assert_eq!(stats.snapshot().trades_produced, 1);
    }
}
