//! Pipeline Error Types

use thiserror::Error;

use crate::channel::ChannelError;
use crate::core_types::TradeId;
use crate::models::TradeStatus;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// A blocking push/pop was woken by stop(); the cancel signal stays set.
    #[error("Stage {stage} interrupted while blocked on a channel")]
    Interrupted { stage: &'static str },

    #[error("Trade {trade_id}: illegal status transition {from} -> {to}")]
    InvalidTransition {
        trade_id: TradeId,
        from: TradeStatus,
        to: TradeStatus,
    },

    #[error("Failed to spawn worker thread for stage {stage}: {source}")]
    Spawn {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker thread for stage {stage} panicked")]
    WorkerPanicked { stage: &'static str },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// True for the cancellation path (stop() woke a blocked push/pop)
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            PipelineError::Interrupted { .. } | PipelineError::Channel(ChannelError::Interrupted)
        )
    }
}
