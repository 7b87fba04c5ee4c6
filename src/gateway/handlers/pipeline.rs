//! Pipeline control handlers
//!
//! Every response body is `{"response_message": ...}`. Failures map to 500
//! with the error text as the message.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use tracing::error;

use super::super::state::AppState;
use super::super::types::{PipelineResponse, messages};
use crate::error::PipelineError;
use crate::service::{PipelineService, ServiceStatus};

type ControlResult = Result<Json<PipelineResponse>, (StatusCode, Json<PipelineResponse>)>;

fn internal_error(e: impl std::fmt::Display) -> (StatusCode, Json<PipelineResponse>) {
    error!(error = %e, "Pipeline control request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(PipelineResponse::new(e.to_string())),
    )
}

/// Run a classic-pipeline operation off the async runtime; stop joins threads.
async fn run_classic<F>(state: &AppState, op: F, ok_message: &str) -> ControlResult
where
    F: FnOnce(&PipelineService) -> Result<(), PipelineError> + Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || op(&*service))
        .await
        .map_err(internal_error)?
        .map_err(internal_error)?;
    Ok(Json(PipelineResponse::new(ok_message)))
}

/// Start the classic blocking queue pipeline
#[utoipa::path(
    get,
    path = "/api/concurrency/classic/start",
    responses(
        (status = 200, description = "Pipeline started (or already running)", body = PipelineResponse),
        (status = 500, description = "A stage failed to start", body = PipelineResponse)
    ),
    tag = "Pipeline"
)]
pub async fn start_classic(State(state): State<Arc<AppState>>) -> ControlResult {
    run_classic(
        &state,
        PipelineService::start_classic_pipeline,
        messages::CLASSIC_STARTED,
    )
    .await
}

/// Stop the classic blocking queue pipeline
#[utoipa::path(
    get,
    path = "/api/concurrency/classic/stop",
    responses(
        (status = 200, description = "Pipeline stopped (or already stopped)", body = PipelineResponse),
        (status = 500, description = "A stage failed to stop cleanly", body = PipelineResponse)
    ),
    tag = "Pipeline"
)]
pub async fn stop_classic(State(state): State<Arc<AppState>>) -> ControlResult {
    run_classic(
        &state,
        PipelineService::stop_classic_pipeline,
        messages::CLASSIC_STOPPED,
    )
    .await
}

/// Start the lightweight task pipeline
#[utoipa::path(
    get,
    path = "/api/concurrency/lightweight/start",
    responses(
        (status = 200, description = "Pipeline started (or already running)", body = PipelineResponse),
        (status = 500, description = "Pipeline failed to start", body = PipelineResponse)
    ),
    tag = "Pipeline"
)]
pub async fn start_lightweight(State(state): State<Arc<AppState>>) -> ControlResult {
    state
        .service
        .start_alternate_pipeline()
        .await
        .map_err(internal_error)?;
    Ok(Json(PipelineResponse::new(messages::LIGHTWEIGHT_STARTED)))
}

/// Stop the lightweight task pipeline
#[utoipa::path(
    get,
    path = "/api/concurrency/lightweight/stop",
    responses(
        (status = 200, description = "Pipeline stopped (or already stopped)", body = PipelineResponse),
        (status = 500, description = "A stage task failed", body = PipelineResponse)
    ),
    tag = "Pipeline"
)]
pub async fn stop_lightweight(State(state): State<Arc<AppState>>) -> ControlResult {
    state
        .service
        .stop_alternate_pipeline()
        .await
        .map_err(internal_error)?;
    Ok(Json(PipelineResponse::new(messages::LIGHTWEIGHT_STOPPED)))
}

/// Lifecycle state and counters of both pipelines
#[utoipa::path(
    get,
    path = "/api/concurrency/status",
    responses(
        (status = 200, description = "Current pipeline status", body = ServiceStatus)
    ),
    tag = "Pipeline"
)]
pub async fn pipeline_status(State(state): State<Arc<AppState>>) -> Json<ServiceStatus> {
    Json(state.service.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::worker::WorkerState;

    fn test_state() -> Arc<AppState> {
        let config = PipelineConfig {
            queue_capacity: 8,
            stage_capacity: 8,
            produce_interval_ms: 10,
            ..Default::default()
        };
        Arc::new(AppState::new(Arc::new(
            PipelineService::new(&config).unwrap(),
        )))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_classic_start_stop_messages() {
        let state = test_state();

        let Json(resp) = start_classic(State(state.clone())).await.unwrap();
        assert_eq!(
            resp.response_message,
            "Classic blocking queue pipeline started."
        );
        assert_eq!(state.service.status().classic, WorkerState::Running);

        let Json(resp) = stop_classic(State(state.clone())).await.unwrap();
        assert_eq!(
            resp.response_message,
            "Classic blocking queue pipeline stopped."
        );
        assert_eq!(state.service.status().classic, WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_lightweight_start_stop_messages() {
        let state = test_state();

        let Json(resp) = start_lightweight(State(state.clone())).await.unwrap();
        assert_eq!(resp.response_message, "Lightweight task pipeline started.");

        let Json(status) = pipeline_status(State(state.clone())).await;
        assert_eq!(status.alternate, WorkerState::Running);
        assert_eq!(status.classic, WorkerState::Stopped);

        let Json(resp) = stop_lightweight(State(state.clone())).await.unwrap();
        assert_eq!(resp.response_message, "Lightweight task pipeline stopped.");
    }

    #[tokio::test]
    async fn test_stop_when_never_started() {
        let state = test_state();
        let Json(resp) = stop_lightweight(State(state)).await.unwrap();
        assert_eq!(resp.response_message, "Lightweight task pipeline stopped.");
    }

    #[test]
    fn test_error_maps_to_500() {
        let (status, Json(body)) = internal_error(PipelineError::WorkerPanicked { stage: "auditor" });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.response_message, "Worker thread for stage auditor panicked");
    }
}
