//! Pipeline Service - the operations exposed to the outside world
//!
//! Wraps one classic [`PipelineOrchestrator`] and one [`LightweightPipeline`],
//! both built once at startup. Classic start/stop block the caller (stop joins
//! threads); async callers should go through `spawn_blocking`.

use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::lightweight::{LightweightPipeline, LightweightReport};
use crate::orchestrator::{PipelineOrchestrator, PipelineReport};
use crate::worker::WorkerState;

/// State of both pipeline modes
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceStatus {
    pub classic: WorkerState,
    pub alternate: WorkerState,
    pub classic_stats: PipelineReport,
    pub alternate_stats: LightweightReport,
}

#[derive(Debug)]
pub struct PipelineService {
    classic: PipelineOrchestrator,
    alternate: LightweightPipeline,
}

impl PipelineService {
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            classic: PipelineOrchestrator::new(config)?,
            alternate: LightweightPipeline::new(config)?,
        })
    }

    /// Idempotent
    pub fn start_classic_pipeline(&self) -> Result<(), PipelineError> {
        info!("Starting classic blocking queue pipeline");
        self.classic.start_pipeline()
    }

    /// Idempotent; blocks until every worker thread has exited
    pub fn stop_classic_pipeline(&self) -> Result<(), PipelineError> {
        info!("Stopping classic blocking queue pipeline");
        self.classic.stop_pipeline()
    }

    pub async fn start_alternate_pipeline(&self) -> Result<(), PipelineError> {
        info!("Starting lightweight task pipeline");
        self.alternate.start().await;
        Ok(())
    }

    pub async fn stop_alternate_pipeline(&self) -> Result<(), PipelineError> {
        info!("Stopping lightweight task pipeline");
        self.alternate.stop().await
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            classic: self.classic.state(),
            alternate: self.alternate.state(),
            classic_stats: self.classic.stats(),
            alternate_stats: self.alternate.stats(),
        }
    }

    pub fn classic(&self) -> &PipelineOrchestrator {
        &self.classic
    }

    pub fn alternate(&self) -> &LightweightPipeline {
        &self.alternate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig {
            queue_capacity: 8,
            stage_capacity: 8,
            produce_interval_ms: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_modes_are_independent() {
        let service = PipelineService::new(&config()).unwrap();
        assert_eq!(service.status().classic, WorkerState::Stopped);
        assert_eq!(service.status().alternate, WorkerState::Stopped);

        service.start_alternate_pipeline().await.unwrap();
        let status = service.status();
        assert_eq!(status.alternate, WorkerState::Running);
        assert_eq!(status.classic, WorkerState::Stopped);

        service.stop_alternate_pipeline().await.unwrap();
        service.stop_alternate_pipeline().await.unwrap();
        assert_eq!(service.status().alternate, WorkerState::Stopped);
    }

    #[test]
    fn test_classic_start_stop_idempotent() {
        let service = PipelineService::new(&config()).unwrap();
        service.stop_classic_pipeline().unwrap();
        service.start_classic_pipeline().unwrap();
        service.start_classic_pipeline().unwrap();
        assert_eq!(service.status().classic, WorkerState::Running);
        service.stop_classic_pipeline().unwrap();
        service.stop_classic_pipeline().unwrap();
        assert_eq!(service.status().classic, WorkerState::Stopped);
    }
}
