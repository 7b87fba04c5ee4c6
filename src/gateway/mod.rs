pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tracing::info;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;
use state::AppState;

/// Build the complete router: pipeline control, health check and API docs.
pub fn build_router(state: Arc<AppState>) -> Router {
    let concurrency_routes = Router::new()
        .route("/classic/start", get(handlers::start_classic))
        .route("/classic/stop", get(handlers::stop_classic))
        .route("/lightweight/start", get(handlers::start_lightweight))
        .route("/lightweight/stop", get(handlers::stop_lightweight))
        .route("/status", get(handlers::pipeline_status));

    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .nest("/api/concurrency", concurrency_routes)
        .with_state(state)
        // Stateless, added after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Serve until `shutdown` resolves.
pub async fn run_server(
    config: &GatewayConfig,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {addr}: {e}"))?;

    info!(addr = %addr, "Gateway listening");
    info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::PipelineConfig;
    use crate::service::PipelineService;

    fn test_router() -> Router {
        let config = PipelineConfig {
            queue_capacity: 8,
            stage_capacity: 8,
            produce_interval_ms: 10,
            ..Default::default()
        };
        let service = Arc::new(PipelineService::new(&config).unwrap());
        build_router(Arc::new(AppState::new(service)))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_router_serves_classic_stop() {
        let (status, body) = get_json(test_router(), "/api/concurrency/classic/stop").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["response_message"],
            "Classic blocking queue pipeline stopped."
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_router_start_then_status() {
        let app = test_router();

        let (status, body) = get_json(app.clone(), "/api/concurrency/classic/start").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["response_message"],
            "Classic blocking queue pipeline started."
        );

        let (status, body) = get_json(app.clone(), "/api/concurrency/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["classic"], "RUNNING");
        assert_eq!(body["alternate"], "STOPPED");

        let (status, _) = get_json(app.clone(), "/api/concurrency/classic/stop").await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = get_json(app, "/api/concurrency/status").await;
        assert_eq!(body["classic"], "STOPPED");
    }

    #[tokio::test]
    async fn test_router_health_and_unknown_route() {
        let (status, body) = get_json(test_router(), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["version"].is_string());

        let (status, _) = get_json(test_router(), "/api/concurrency/turbo/start").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
