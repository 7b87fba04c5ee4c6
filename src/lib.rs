//! Forex Engine - bounded multi-stage trade pipeline
//!
//! Trades are synthesized on a fixed schedule and flow through
//! validation, enrichment, settlement and audit. Stages are connected by
//! bounded blocking channels: a full channel parks the producer, which is the
//! only backpressure mechanism. Each stage can be started and stopped
//! independently, and stop is safe while a stage is blocked.
//!
//! # Modules
//!
//! - [`core_types`] - Identifier aliases
//! - [`models`] - Trade record and status lifecycle
//! - [`channel`] - Bounded blocking FIFO channel
//! - [`cancel`] - Cancellation token for blocked workers
//! - [`worker`] - Stage worker lifecycle (dedicated thread per stage)
//! - [`stages`] - Producer and the downstream trade processors
//! - [`orchestrator`] - Classic thread-per-stage pipeline
//! - [`lightweight`] - Same pipeline on tokio tasks
//! - [`service`] - Start/stop/status operations for both modes
//! - [`stats`] - Pipeline counters
//! - [`gateway`] - HTTP API
//! - [`config`] / [`logging`] - Ambient setup

// Core types - must be first!
pub mod core_types;

pub mod models;

// Pipeline machinery
pub mod cancel;
pub mod channel;
pub mod error;
pub mod orchestrator;
pub mod stages;
pub mod stats;
pub mod worker;

pub mod lightweight;
pub mod service;

// Runtime setup and HTTP surface
pub mod config;
pub mod gateway;
pub mod logging;

// Convenient re-exports at crate root
pub use cancel::CancelToken;
pub use channel::{BoundedChannel, ChannelError, Interruptible};
pub use config::{AppConfig, ConfigError, PipelineConfig};
pub use error::PipelineError;
pub use lightweight::LightweightPipeline;
pub use models::{Trade, TradeStatus};
pub use orchestrator::PipelineOrchestrator;
pub use service::{PipelineService, ServiceStatus};
pub use stages::{AuditTrail, StageKind, TradeProcessor};
pub use stats::{PipelineStats, PipelineStatsSnapshot};
pub use worker::{Schedule, StageTask, StageWorker, WorkerState};
