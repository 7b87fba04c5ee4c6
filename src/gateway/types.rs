//! Gateway response types

use serde::Serialize;
use utoipa::ToSchema;

/// Body of every pipeline control response, success or failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PipelineResponse {
    #[schema(example = "Classic blocking queue pipeline started.")]
    pub response_message: String,
}

impl PipelineResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            response_message: message.into(),
        }
    }
}

/// Health check response data
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_u64)]
    pub timestamp_ms: u64,
    /// Crate version and git revision
    #[schema(example = "0.1.0 (a1b2c3d)")]
    pub version: String,
}

pub mod messages {
    pub const CLASSIC_STARTED: &str = "Classic blocking queue pipeline started.";
    pub const CLASSIC_STOPPED: &str = "Classic blocking queue pipeline stopped.";
    pub const LIGHTWEIGHT_STARTED: &str = "Lightweight task pipeline started.";
    pub const LIGHTWEIGHT_STOPPED: &str = "Lightweight task pipeline stopped.";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_response_wire_format() {
        let body = serde_json::to_value(PipelineResponse::new(messages::CLASSIC_STARTED)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "response_message": "Classic blocking queue pipeline started." })
        );
    }
}
