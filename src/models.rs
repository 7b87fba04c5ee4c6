// models.rs - Trade record and its status lifecycle

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{AccountId, BrokerId, CurrencyCode, TradeId};
use crate::error::PipelineError;

/// Scale used for amount, rate and converted amount
pub const MONEY_SCALE: u32 = 8;

/// Trade status - one per pipeline stage, plus REJECTED
///
/// ```text
/// NEW ──▶ VALIDATED ──▶ ENRICHED ──▶ SETTLED ──▶ AUDITED
///  │
///  └────▶ REJECTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    New,
    Validated,
    Enriched,
    Settled,
    Audited,
    Rejected,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::New => "NEW",
            TradeStatus::Validated => "VALIDATED",
            TradeStatus::Enriched => "ENRICHED",
            TradeStatus::Settled => "SETTLED",
            TradeStatus::Audited => "AUDITED",
            TradeStatus::Rejected => "REJECTED",
        }
    }

    /// Whether `self -> next` is a legal lifecycle step
    pub fn can_transition_to(&self, next: TradeStatus) -> bool {
        matches!(
            (self, next),
            (TradeStatus::New, TradeStatus::Validated)
                | (TradeStatus::New, TradeStatus::Rejected)
                | (TradeStatus::Validated, TradeStatus::Enriched)
                | (TradeStatus::Enriched, TradeStatus::Settled)
                | (TradeStatus::Settled, TradeStatus::Audited)
        )
    }

    /// REJECTED and AUDITED never move again
    pub fn is_terminal(&self) -> bool {
        matches!(self, TradeStatus::Rejected | TradeStatus::Audited)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// TRADE
// ============================================================

/// One unit of pipeline work.
///
/// Fields are private: a stage never mutates a trade in place, it consumes the
/// value and gets back a new one with an advanced status. The identifier is
/// carried over unchanged by every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    id: TradeId,
    account_id: AccountId,
    broker_id: BrokerId,
    from_currency: CurrencyCode,
    to_currency: CurrencyCode,
    units: u32,
    amount: Decimal,
    rate: Decimal,
    status: TradeStatus,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    converted_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    settled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reject_reason: Option<String>,
}

impl Trade {
    /// Create a NEW trade
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TradeId,
        account_id: AccountId,
        broker_id: BrokerId,
        from_currency: impl Into<CurrencyCode>,
        to_currency: impl Into<CurrencyCode>,
        units: u32,
        amount: Decimal,
        rate: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id,
            broker_id,
            from_currency: from_currency.into(),
            to_currency: to_currency.into(),
            units,
            amount,
            rate,
            status: TradeStatus::New,
            created_at,
            converted_amount: None,
            settled_at: None,
            reject_reason: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn broker_id(&self) -> &str {
        &self.broker_id
    }

    pub fn from_currency(&self) -> &str {
        &self.from_currency
    }

    pub fn to_currency(&self) -> &str {
        &self.to_currency
    }

    pub fn units(&self) -> u32 {
        self.units
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn status(&self) -> TradeStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// `amount × rate`, set by the enrichment stage
    pub fn converted_amount(&self) -> Option<Decimal> {
        self.converted_amount
    }

    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.settled_at
    }

    pub fn reject_reason(&self) -> Option<&str> {
        self.reject_reason.as_deref()
    }

    // ------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------

    fn transition(mut self, next: TradeStatus) -> Result<Self, PipelineError> {
        if !self.status.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                trade_id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(self)
    }

    pub fn validated(self) -> Result<Self, PipelineError> {
        self.transition(TradeStatus::Validated)
    }

    pub fn rejected(self, reason: impl Into<String>) -> Result<Self, PipelineError> {
        let mut trade = self.transition(TradeStatus::Rejected)?;
        trade.reject_reason = Some(reason.into());
        Ok(trade)
    }

    /// Attach the converted amount (`amount × rate`, rounded to [`MONEY_SCALE`])
    pub fn enriched(self) -> Result<Self, PipelineError> {
        let converted = (self.amount * self.rate).round_dp(MONEY_SCALE);
        let mut trade = self.transition(TradeStatus::Enriched)?;
        trade.converted_amount = Some(converted);
        Ok(trade)
    }

    pub fn settled(self, at: DateTime<Utc>) -> Result<Self, PipelineError> {
        let mut trade = self.transition(TradeStatus::Settled)?;
        trade.settled_at = Some(at);
        Ok(trade)
    }

    pub fn audited(self) -> Result<Self, PipelineError> {
        self.transition(TradeStatus::Audited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_trade(id: &str) -> Trade {
        Trade::new(
            id.to_string(),
            "acc-1".to_string(),
            "broker-1".to_string(),
            "USD",
            "EUR",
            10,
            Decimal::new(150_000_000_000, MONEY_SCALE),
            Decimal::new(92_000_000, MONEY_SCALE),
            Utc::now(),
        )
    }

    #[test]
    fn test_new_trade_is_new() {
        let trade = make_test_trade("t1");
        assert_eq!(trade.status(), TradeStatus::New);
        assert_eq!(trade.id(), "t1");
        assert!(trade.converted_amount().is_none());
        assert!(trade.settled_at().is_none());
    }

    #[test]
    fn test_full_lifecycle_keeps_id() {
        let trade = make_test_trade("t1")
            .validated()
            .and_then(Trade::enriched)
            .and_then(|t| t.settled(Utc::now()))
            .and_then(Trade::audited)
            .unwrap();

        assert_eq!(trade.id(), "t1");
        assert_eq!(trade.status(), TradeStatus::Audited);
        assert!(trade.settled_at().is_some());
    }

    #[test]
    fn test_enriched_computes_converted_amount() {
        let trade = make_test_trade("t1").validated().unwrap().enriched().unwrap();
        // 1500 * 0.92
        assert_eq!(trade.converted_amount(), Some(Decimal::new(1380, 0)));
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let err = make_test_trade("t1").settled(Utc::now()).unwrap_err();
        match err {
            PipelineError::InvalidTransition { trade_id, from, to } => {
                assert_eq!(trade_id, "t1");
                assert_eq!(from, TradeStatus::New);
                assert_eq!(to, TradeStatus::Settled);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejected_is_terminal() {
        let trade = make_test_trade("t1").rejected("units must be positive").unwrap();
        assert_eq!(trade.reject_reason(), Some("units must be positive"));
        assert!(trade.status().is_terminal());
        assert!(trade.validated().is_err());
    }

    #[test]
    fn test_status_serializes_upper_case() {
        let json = serde_json::to_string(&TradeStatus::Validated).unwrap();
        assert_eq!(json, "\"VALIDATED\"");
        assert_eq!(TradeStatus::New.to_string(), "NEW");
    }
}
