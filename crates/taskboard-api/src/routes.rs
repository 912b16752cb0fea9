//! API routes.

use axum::http::Uri;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::timeout::TimeoutLayer;

use crate::error::ApiError;
use crate::handlers::{get_job, get_overview, get_queue_counts, health, list_jobs, list_queues, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        .route("/overview", get(get_overview))
        .route("/queues", get(list_queues))
        .route("/queues/:queue", get(get_queue_counts))
        .route("/queues/:queue/:id", get(get_job))
        .route("/queues/:queue/jobs/:state", get(list_jobs));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .fallback(not_found)
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(uri.path().to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use taskboard_queue::{InspectorConfig, MemoryStore, QueueInspector, ScriptRuntime};
    use tower::ServiceExt;

    use super::*;
    use crate::config::ApiConfig;

    fn app() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let scripts = Arc::new(ScriptRuntime::load().unwrap());
        let config = InspectorConfig {
            namespace: "bull".to_string(),
            ..InspectorConfig::default()
        };
        let inspector = QueueInspector::new(store.clone(), scripts, config);
        let router = create_router(AppState::new(ApiConfig::default(), inspector), None);
        (router, store)
    }

    fn seed_mail(store: &MemoryStore) {
        for (score, id, user) in [(1.0, "1", "alice"), (2.0, "2", "bob"), (3.0, "3", "alice")] {
            let data = format!(r#"{{"user":"{user}"}}"#);
            store.put_hash(
                &format!("bull:mail:{id}"),
                &[("name", "send"), ("data", data.as_str()), ("opts", "{}"), ("attemptsMade", "1")],
            );
            store.index_add("bull:mail:failed", score, id);
        }
        store.list_push("bull:reports:wait", "9");
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_list_queues() {
        let (app, store) = app();
        seed_mail(&store);

        let (status, body) = get_json(app, "/api/queues").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["queues"], serde_json::json!(["mail", "reports"]));
        assert_eq!(body["count"], 2);
    }

    #[tokio::test]
    async fn test_queue_counts_use_public_state_names() {
        let (app, store) = app();
        seed_mail(&store);

        let (status, body) = get_json(app.clone(), "/api/queues/mail").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["counts"]["failed"], 3);
        assert_eq!(body["counts"]["waiting"], 0);

        let (_, body) = get_json(app, "/api/queues/reports").await;
        assert_eq!(body["counts"]["waiting"], 1);
    }

    #[tokio::test]
    async fn test_overview() {
        let (app, store) = app();
        seed_mail(&store);

        let (status, body) = get_json(app, "/api/overview").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["queue_counts"]["mail"]["failed"], 3);
        assert_eq!(body["queue_counts"]["reports"]["waiting"], 1);
    }

    #[tokio::test]
    async fn test_get_job() {
        let (app, store) = app();
        seed_mail(&store);

        let (status, body) = get_json(app, "/api/queues/mail/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "2");
        assert_eq!(body["data"]["user"], "bob");
        assert_eq!(body["attempts_made"], 1);
    }

    #[tokio::test]
    async fn test_get_job_errors() {
        let (app, store) = app();
        seed_mail(&store);

        let (status, body) = get_json(app.clone(), "/api/queues/mail/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());

        let (status, _) = get_json(app.clone(), "/api/queues/mail/404").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        store.fail_on("bull:mail:3");
        let (status, _) = get_json(app, "/api/queues/mail/3").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_list_jobs_with_filter() {
        let (app, store) = app();
        seed_mail(&store);

        let (status, body) = get_json(app, "/api/queues/mail/jobs/failed?start=0&stop=10&filter=alice").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        let ids: Vec<_> = body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|job| job["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, ["3", "1"]);
    }

    #[tokio::test]
    async fn test_list_jobs_treats_empty_offsets_as_absent() {
        let (app, store) = app();
        seed_mail(&store);

        let (status, body) = get_json(app, "/api/queues/mail/jobs/failed?start=&stop=&filter=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["start"], 0);
        assert_eq!(body["stop"], 25);
        assert_eq!(body["results"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_list_jobs_rejects_bad_offsets_with_detail() {
        let (app, store) = app();
        seed_mail(&store);

        let (status, body) = get_json(app, "/api/queues/mail/jobs/failed?stop=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("stop"));
    }

    #[tokio::test]
    async fn test_list_jobs_accepts_both_waiting_names() {
        let (app, store) = app();
        seed_mail(&store);
        store.put_hash("bull:reports:9", &[("data", "{}"), ("opts", "{}")]);

        for state in ["waiting", "wait"] {
            let (status, body) = get_json(app.clone(), &format!("/api/queues/reports/jobs/{state}")).await;
            assert_eq!(status, StatusCode::OK, "{state}");
            assert_eq!(body["count"], 1);
        }
    }

    #[tokio::test]
    async fn test_list_jobs_rejects_unknown_state() {
        let (app, _store) = app();
        let (status, _) = get_json(app, "/api/queues/mail/jobs/paused").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let (app, store) = app();

        let (status, body) = get_json(app.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = get_json(app.clone(), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"]["redis"]["status"], "ok");

        store.fail_on("PING");
        let (status, body) = get_json(app, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let (app, _store) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("X-Request-ID", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (app, _store) = app();
        let (status, body) = get_json(app, "/api/nothing/here/at/all").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap().contains("/api/nothing"));
    }
}
