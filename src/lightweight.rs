//! Lightweight pipeline - the same five stages on tokio tasks
//!
//! Bounded `tokio::sync::mpsc` channels give the same backpressure as the
//! classic pipeline: a full channel parks the sending task on `send().await`.
//! Stop is a `watch` signal raced against every await point.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};
use utoipa::ToSchema;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::Trade;
use crate::stages::{
    AuditSummary, AuditTrail, Auditor, Enricher, Settler, StageKind, TradeProcessor,
    TradeSynthesizer, Validator,
};
use crate::stats::{PipelineStats, PipelineStatsSnapshot};
use crate::worker::WorkerState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LightweightReport {
    pub state: WorkerState,
    pub counters: PipelineStatsSnapshot,
    pub audit: AuditSummary,
}

struct RunHandle {
    stop_tx: watch::Sender<bool>,
    tasks: Vec<(StageKind, JoinHandle<()>)>,
}

pub struct LightweightPipeline {
    config: PipelineConfig,
    stats: Arc<PipelineStats>,
    audit_trail: Arc<AuditTrail>,
    running: AtomicBool,
    handle: Mutex<Option<RunHandle>>,
}

impl LightweightPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        Ok(Self {
            config: config.clone(),
            stats: Arc::new(PipelineStats::new()),
            audit_trail: Arc::new(AuditTrail::new(config.audit_trail_len)),
            running: AtomicBool::new(false),
            handle: Mutex::new(None),
        })
    }

    /// Spawn one task per stage. No-op if already running.
    pub async fn start(&self) {
        let mut slot = self.handle.lock().await;
        if slot.is_some() {
            debug!("Lightweight pipeline already running, start ignored");
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let (trades_tx, trades_rx) = mpsc::channel(self.config.queue_capacity);
        let (validated_tx, validated_rx) = mpsc::channel(self.config.stage_capacity);
        let (enriched_tx, enriched_rx) = mpsc::channel(self.config.stage_capacity);
        let (settled_tx, settled_rx) = mpsc::channel(self.config.stage_capacity);

        let synthesizer = TradeSynthesizer::new(
            self.config.from_currency.clone(),
            self.config.to_currency.clone(),
        );

        let tasks = vec![
            (
                StageKind::Producer,
                tokio::spawn(run_producer(
                    synthesizer,
                    trades_tx,
                    self.config.produce_interval(),
                    self.stats.clone(),
                    stop_rx.clone(),
                )),
            ),
            (
                StageKind::Validator,
                tokio::spawn(run_processor(
                    Validator::new(),
                    trades_rx,
                    Some(validated_tx),
                    self.stats.clone(),
                    stop_rx.clone(),
                )),
            ),
            (
                StageKind::Enricher,
                tokio::spawn(run_processor(
                    Enricher::new(),
                    validated_rx,
                    Some(enriched_tx),
                    self.stats.clone(),
                    stop_rx.clone(),
                )),
            ),
            (
                StageKind::Settler,
                tokio::spawn(run_processor(
                    Settler::new(),
                    enriched_rx,
                    Some(settled_tx),
                    self.stats.clone(),
                    stop_rx.clone(),
                )),
            ),
            (
                StageKind::Auditor,
                tokio::spawn(run_processor(
                    Auditor::new(self.audit_trail.clone()),
                    settled_rx,
                    None,
                    self.stats.clone(),
                    stop_rx,
                )),
            ),
        ];

        *slot = Some(RunHandle { stop_tx, tasks });
        self.running.store(true, Ordering::Release);
        info!(stages = StageKind::ALL.len(), "Lightweight pipeline started");
    }

    /// Signal every task and await it. No-op if already stopped.
    ///
    /// All tasks are awaited; the first one that panicked is reported.
    pub async fn stop(&self) -> Result<(), PipelineError> {
        let mut slot = self.handle.lock().await;
        let Some(RunHandle { stop_tx, tasks }) = slot.take() else {
            return Ok(());
        };
        self.running.store(false, Ordering::Release);

        // receivers may already be gone if every task exited
        let _ = stop_tx.send(true);

        let mut first_err = None;
        for (stage, task) in tasks {
            if let Err(e) = task.await {
                error!(stage = stage.name(), error = %e, "Lightweight stage task failed");
                first_err.get_or_insert(PipelineError::WorkerPanicked {
                    stage: stage.name(),
                });
            }
        }
        info!(stats = %self.stats.snapshot(), "Lightweight pipeline stopped");
        first_err.map_or(Ok(()), Err)
    }

    pub fn state(&self) -> WorkerState {
        if self.running.load(Ordering::Acquire) {
            WorkerState::Running
        } else {
            WorkerState::Stopped
        }
    }

    pub fn stats(&self) -> LightweightReport {
        LightweightReport {
            state: self.state(),
            counters: self.stats.snapshot(),
            audit: self.audit_trail.summary(),
        }
    }

    pub fn audit_trail(&self) -> &Arc<AuditTrail> {
        &self.audit_trail
    }
}

impl std::fmt::Debug for LightweightPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightweightPipeline")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

/// Resolves once the stop flag is set (or the sender is gone)
async fn stopped(stop: &mut watch::Receiver<bool>) {
    loop {
        let is_stopped = *stop.borrow_and_update();
        if is_stopped || stop.changed().await.is_err() {
            return;
        }
    }
}

async fn run_producer(
    mut synthesizer: TradeSynthesizer,
    tx: mpsc::Sender<Trade>,
    period: Duration,
    stats: Arc<PipelineStats>,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut stop) => break,
            _ = ticker.tick() => {}
        }

        let trade = synthesizer.next_trade();
        let trade_id = trade.id().to_string();
        tokio::select! {
            biased;
            _ = stopped(&mut stop) => {
                stats.incr_interrupted();
                break;
            }
            sent = tx.send(trade) => {
                if sent.is_err() {
                    break;
                }
                stats.incr_produced();
                debug!(trade_id = %trade_id, "Trade produced");
            }
        }
    }
    debug!(stage = StageKind::Producer.name(), "Lightweight task exiting");
}

async fn run_processor<P: TradeProcessor>(
    mut processor: P,
    mut rx: mpsc::Receiver<Trade>,
    tx: Option<mpsc::Sender<Trade>>,
    stats: Arc<PipelineStats>,
    mut stop: watch::Receiver<bool>,
) {
    let stage = processor.stage().name();

    loop {
        let trade = tokio::select! {
            biased;
            _ = stopped(&mut stop) => break,
            received = rx.recv() => match received {
                Some(trade) => trade,
                None => break,
            },
        };

        let status_in = trade.status();
        let out = match panic::catch_unwind(AssertUnwindSafe(|| processor.process(trade))) {
            Ok(Ok(Some(out))) => out,
            Ok(Ok(None)) => {
                stats.incr_audited();
                continue;
            }
            Ok(Err(e)) => {
                stats.incr_tick_failure();
                error!(stage, error = %e, "Trade processing failed, trade dropped");
                continue;
            }
            Err(_) => {
                stats.incr_tick_failure();
                error!(stage, "Trade processing panicked, trade dropped");
                continue;
            }
        };

        if out.status() != status_in {
            stats.record_status(out.status());
        }

        let Some(tx) = &tx else {
            continue;
        };
        tokio::select! {
            biased;
            _ = stopped(&mut stop) => {
                stats.incr_interrupted();
                break;
            }
            sent = tx.send(out) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    debug!(stage, "Lightweight task exiting");
}
