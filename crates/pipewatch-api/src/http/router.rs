//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`. Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Workflows
        .route(
            "/workflows",
            get(handlers::workflow::list_workflows).post(handlers::workflow::register_workflow),
        )
        .route("/workflows/{id}", get(handlers::workflow::get_workflow))
        .route(
            "/workflows/{id}/execute",
            post(handlers::workflow::execute_workflow),
        )
        // Executions
        .route("/executions", get(handlers::execution::list_executions))
        .route("/executions/{id}", get(handlers::execution::get_execution))
        .route(
            "/executions/{id}/resume",
            post(handlers::execution::resume_execution),
        )
        // Dashboard stats
        .route("/stats", get(handlers::stats::get_stats));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness probe.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn test_router() -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::init_in(dir.path().to_path_buf()).await.unwrap();
        (build_router(state), dir)
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn echo_workflow() -> Value {
        json!({
            "id": "wf1",
            "name": "Echo",
            "steps": [
                {"id": "s1", "agent": "echo", "action": "run", "input": "hello", "output": "o1"},
                {"id": "s2", "agent": "echo", "action": "run", "input": "${o1}", "output": "o2", "condition": "${flag}"}
            ]
        })
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (router, _dir) = test_router().await;
        let (status, body) = send(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ok"));
    }

    #[tokio::test]
    async fn register_execute_and_query() {
        let (router, dir) = test_router().await;

        let (status, body) =
            send(&router, Method::POST, "/api/v1/workflows", Some(echo_workflow())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], json!("wf1"));
        assert!(body["data"]["registered_at"].is_string());
        assert!(dir.path().join("workflows").join("wf1.yaml").is_file());

        let (status, body) = send(&router, Method::GET, "/api/v1/workflows", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["steps"], json!(2));

        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/workflows/wf1/execute",
            Some(json!({"flag": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], json!("completed"));
        assert_eq!(body["data"]["outputs"]["o1"], json!("hello"));
        assert_eq!(body["data"]["steps"].as_array().unwrap().len(), 1);
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) =
            send(&router, Method::GET, &format!("/api/v1/executions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], json!(id));

        let (status, body) = send(
            &router,
            Method::GET,
            "/api/v1/executions?workflow_id=wf1&status=completed&limit=5",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, body) = send(&router, Method::GET, "/api/v1/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["registered_workflows"], json!(1));
        assert_eq!(body["data"]["completed"], json!(1));
        assert_eq!(body["data"]["total_executions"], json!(1));

        // Completed executions cannot be resumed.
        let (status, body) = send(
            &router,
            Method::POST,
            &format!("/api/v1/executions/{id}/resume"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["errors"][0]["code"], json!("INVALID_STATE"));
    }

    #[tokio::test]
    async fn error_statuses() {
        let (router, _dir) = test_router().await;

        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/workflows",
            Some(json!({"name": "no id", "steps": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], json!("VALIDATION_ERROR"));

        let (status, _) = send(&router, Method::GET, "/api/v1/workflows/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            send(&router, Method::POST, "/api/v1/workflows/nope/execute", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let missing = uuid::Uuid::now_v7();
        let (status, body) =
            send(&router, Method::GET, &format!("/api/v1/executions/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["code"], json!("EXECUTION_NOT_FOUND"));

        let (status, _) =
            send(&router, Method::GET, "/api/v1/executions?status=paused", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
