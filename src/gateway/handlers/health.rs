//! Health check handler

use std::time::{SystemTime, UNIX_EPOCH};

use axum::Json;

use super::super::types::HealthResponse;

pub fn version_string() -> String {
    format!("{} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"))
}

/// Health check endpoint
///
/// Returns the server timestamp and build version.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json")
    ),
    tag = "System"
)]
pub async fn health_check() -> Json<HealthResponse> {
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    Json(HealthResponse {
        timestamp_ms,
        version: version_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let Json(resp) = health_check().await;
        assert!(resp.timestamp_ms > 0);
        assert!(resp.version.starts_with(env!("CARGO_PKG_VERSION")));
    }
}
