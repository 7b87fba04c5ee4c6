//! Core types used throughout the system
//!
//! These are fundamental type aliases used by all modules.
//! They provide semantic meaning and enable future type evolution.

/// Trade ID - opaque UUID string, globally unique for a pipeline run.
///
/// # Constraints:
/// - **Immutable**: Once enqueued, NEVER changes
/// - **Opaque**: Never parsed, only compared and logged
pub type TradeId = String;

/// Account ID - opaque UUID string
pub type AccountId = String;

/// Broker ID - opaque UUID string
pub type BrokerId = String;

/// ISO-4217 style currency code (e.g. "USD")
pub type CurrencyCode = String;
