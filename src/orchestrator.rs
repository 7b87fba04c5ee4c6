//! Pipeline Orchestrator - owns the classic (thread-per-stage) pipeline
//!
//! Built once from [`PipelineConfig`]: four bounded channels, five stage
//! workers. Start and stop walk the workers in [`StageKind::ALL`] order.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::channel::{BoundedChannel, Interruptible};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::Trade;
use crate::stages::{
    AuditSummary, AuditTrail, Auditor, Enricher, ProcessorTask, ProducerTask, Settler, StageKind,
    TradeSynthesizer, Validator,
};
use crate::stats::{PipelineStats, PipelineStatsSnapshot};
use crate::worker::{Schedule, StageWorker, WorkerState};

/// Occupancy of one channel
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChannelStats {
    pub name: String,
    pub len: usize,
    pub capacity: usize,
    pub backpressure_events: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkerStats {
    pub name: String,
    pub state: WorkerState,
    pub ticks: u64,
    pub failures: u64,
}

/// Point-in-time view of a pipeline
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PipelineReport {
    pub state: WorkerState,
    pub counters: PipelineStatsSnapshot,
    pub channels: Vec<ChannelStats>,
    pub workers: Vec<WorkerStats>,
    pub audit: AuditSummary,
}

/// The four inter-stage channels
#[derive(Debug, Clone)]
pub struct StageChannels {
    pub trades: Arc<BoundedChannel<Trade>>,
    pub validated: Arc<BoundedChannel<Trade>>,
    pub enriched: Arc<BoundedChannel<Trade>>,
    pub settled: Arc<BoundedChannel<Trade>>,
}

impl StageChannels {
    fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            trades: Arc::new(BoundedChannel::new("trades", config.queue_capacity)?),
            validated: Arc::new(BoundedChannel::new("validated", config.stage_capacity)?),
            enriched: Arc::new(BoundedChannel::new("enriched", config.stage_capacity)?),
            settled: Arc::new(BoundedChannel::new("settled", config.stage_capacity)?),
        })
    }

    fn all(&self) -> [&Arc<BoundedChannel<Trade>>; 4] {
        [&self.trades, &self.validated, &self.enriched, &self.settled]
    }

    fn stats(&self) -> Vec<ChannelStats> {
        self.all()
            .iter()
            .map(|ch| ChannelStats {
                name: ch.name().to_string(),
                len: ch.len(),
                capacity: ch.capacity(),
                backpressure_events: ch.backpressure_events(),
            })
            .collect()
    }
}

fn wake(channels: &[&Arc<BoundedChannel<Trade>>]) -> Vec<Arc<dyn Interruptible>> {
    channels
        .iter()
        .map(|ch| Arc::clone(*ch) as Arc<dyn Interruptible>)
        .collect()
}

pub struct PipelineOrchestrator {
    channels: StageChannels,
    /// In [`StageKind::ALL`] order
    workers: Vec<StageWorker>,
    stats: Arc<PipelineStats>,
    audit_trail: Arc<AuditTrail>,
}

impl PipelineOrchestrator {
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let channels = StageChannels::new(config)?;
        let stats = Arc::new(PipelineStats::new());
        let audit_trail = Arc::new(AuditTrail::new(config.audit_trail_len));

        let producer = StageWorker::new(
            StageKind::Producer.name(),
            Schedule::FixedRate {
                initial_delay: Duration::ZERO,
                period: config.produce_interval(),
            },
            Box::new(ProducerTask::new(
                TradeSynthesizer::new(config.from_currency.clone(), config.to_currency.clone()),
                channels.trades.clone(),
                stats.clone(),
            )),
            wake(&[&channels.trades]),
            stats.clone(),
        );

        let validator = StageWorker::new(
            StageKind::Validator.name(),
            Schedule::Continuous,
            Box::new(ProcessorTask::new(
                Validator::new(),
                channels.trades.clone(),
                Some(channels.validated.clone()),
                stats.clone(),
            )),
            wake(&[&channels.trades, &channels.validated]),
            stats.clone(),
        );

        let enricher = StageWorker::new(
            StageKind::Enricher.name(),
            Schedule::Continuous,
            Box::new(ProcessorTask::new(
                Enricher::new(),
                channels.validated.clone(),
                Some(channels.enriched.clone()),
                stats.clone(),
            )),
            wake(&[&channels.validated, &channels.enriched]),
            stats.clone(),
        );

        let settler = StageWorker::new(
            StageKind::Settler.name(),
            Schedule::Continuous,
            Box::new(ProcessorTask::new(
                Settler::new(),
                channels.enriched.clone(),
                Some(channels.settled.clone()),
                stats.clone(),
            )),
            wake(&[&channels.enriched, &channels.settled]),
            stats.clone(),
        );

        let auditor = StageWorker::new(
            StageKind::Auditor.name(),
            Schedule::Continuous,
            Box::new(ProcessorTask::new(
                Auditor::new(audit_trail.clone()),
                channels.settled.clone(),
                None,
                stats.clone(),
            )),
            wake(&[&channels.settled]),
            stats.clone(),
        );

        Ok(Self {
            channels,
            workers: vec![producer, validator, enricher, settler, auditor],
            stats,
            audit_trail,
        })
    }

    /// Start every worker in stage order.
    ///
    /// On failure the error propagates; workers already started keep running.
    pub fn start_pipeline(&self) -> Result<(), PipelineError> {
        for worker in &self.workers {
            worker.start()?;
        }
        info!(stages = self.workers.len(), "Classic pipeline started");
        Ok(())
    }

    /// Stop every worker in stage order. Every worker is attempted; the first
    /// error is returned afterwards.
    pub fn stop_pipeline(&self) -> Result<(), PipelineError> {
        let mut first_err = None;
        for worker in &self.workers {
            if let Err(e) = worker.stop() {
                error!(stage = worker.name(), error = %e, "Failed to stop worker");
                first_err.get_or_insert(e);
            }
        }
        info!(stats = %self.stats.snapshot(), "Classic pipeline stopped");
        first_err.map_or(Ok(()), Err)
    }

    /// RUNNING while any worker runs
    pub fn state(&self) -> WorkerState {
        if self.workers.iter().any(StageWorker::is_running) {
            WorkerState::Running
        } else {
            WorkerState::Stopped
        }
    }

    pub fn worker(&self, stage: StageKind) -> Option<&StageWorker> {
        self.workers.iter().find(|w| w.name() == stage.name())
    }

    pub fn stats(&self) -> PipelineReport {
        PipelineReport {
            state: self.state(),
            counters: self.stats.snapshot(),
            channels: self.channels.stats(),
            workers: self
                .workers
                .iter()
                .map(|w| WorkerStats {
                    name: w.name().to_string(),
                    state: w.state(),
                    ticks: w.ticks(),
                    failures: w.failures(),
                })
                .collect(),
            audit: self.audit_trail.summary(),
        }
    }

    pub fn audit_trail(&self) -> &Arc<AuditTrail> {
        &self.audit_trail
    }

    pub fn channels(&self) -> &StageChannels {
        &self.channels
    }
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("state", &self.state())
            .field("workers", &self.workers)
            .finish()
    }
}
