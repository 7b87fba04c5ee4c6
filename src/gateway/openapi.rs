//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::types::{HealthResponse, PipelineResponse};
use crate::lightweight::LightweightReport;
use crate::orchestrator::{ChannelStats, PipelineReport, WorkerStats};
use crate::service::ServiceStatus;
use crate::stages::AuditSummary;
use crate::stats::PipelineStatsSnapshot;
use crate::worker::WorkerState;

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Forex Engine API",
        version = "1.0",
        description = "Start, stop and observe the bounded multi-stage forex trade pipeline.",
        license(
            name = "Apache 2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::pipeline::start_classic,
        crate::gateway::handlers::pipeline::stop_classic,
        crate::gateway::handlers::pipeline::start_lightweight,
        crate::gateway::handlers::pipeline::stop_lightweight,
        crate::gateway::handlers::pipeline::pipeline_status,
    ),
    components(
        schemas(
            HealthResponse,
            PipelineResponse,
            ServiceStatus,
            PipelineReport,
            LightweightReport,
            ChannelStats,
            WorkerStats,
            PipelineStatsSnapshot,
            AuditSummary,
            WorkerState,
        )
    ),
    tags(
        (name = "Pipeline", description = "Pipeline lifecycle control and status"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Forex Engine API");
        assert_eq!(spec.info.version, "1.0");
    }

    #[test]
    fn test_openapi_json_serializable() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("Forex Engine API"));
        assert!(json.contains("response_message"));
    }

    #[test]
    fn test_pipeline_endpoints_registered() {
        let paths = ApiDoc::openapi().paths;
        for path in [
            "/api/v1/health",
            "/api/concurrency/classic/start",
            "/api/concurrency/classic/stop",
            "/api/concurrency/lightweight/start",
            "/api/concurrency/lightweight/stop",
            "/api/concurrency/status",
        ] {
            assert!(paths.paths.contains_key(path), "missing {path}");
        }
    }
}
