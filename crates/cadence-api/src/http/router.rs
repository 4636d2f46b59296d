//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`, plus `/health`.
//! Middleware: CORS, tracing.

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
        // Cadence definitions
        .route(
            "/cadences",
            post(handlers::cadence::create_cadence).get(handlers::cadence::list_cadences),
        )
        .route(
            "/cadences/{id}",
            get(handlers::cadence::get_cadence)
                .put(handlers::cadence::update_cadence)
                .delete(handlers::cadence::delete_cadence),
        )
        // Enrollments
        .route("/enrollments", post(handlers::enrollment::create_enrollment))
        .route("/enrollments/{id}", get(handlers::enrollment::get_enrollment))
        .route(
            "/enrollments/{id}/update-cadence",
            post(handlers::enrollment::update_enrollment_cadence),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(handlers::health::health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use cadence_core::substrate::ConnectionManager;
    use cadence_types::config::GlobalConfig;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::state::{AnySubstrate, open_embedded_substrate};

    struct TestApp {
        router: Router,
        connection: Arc<ConnectionManager>,
        _dir: TempDir,
    }

    async fn app(connected: bool) -> TestApp {
        let dir = TempDir::new().unwrap();
        let config = GlobalConfig::default();
        let substrate = open_embedded_substrate(&config, dir.path()).await.unwrap();
        let substrate = Arc::new(AnySubstrate::Embedded(substrate));

        let connection = Arc::new(ConnectionManager::new());
        if connected {
            assert!(connection.connect(substrate.as_ref()).await);
        }

        let state = AppState::new(substrate, Arc::clone(&connection), &config.substrate.task_queue);
        TestApp {
            router: build_router(state),
            connection,
            _dir: dir,
        }
    }

    async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create_welcome_cadence(router: &Router) -> String {
        let (status, body) = call(
            router,
            Method::POST,
            "/api/v1/cadences",
            Some(json!({
                "name": "Welcome",
                "steps": [
                    {"id": "s1", "type": "SEND_EMAIL", "subject": "Welcome", "body": "Hello"},
                    {"id": "w1", "type": "WAIT", "seconds": 10},
                    {"id": "s2", "type": "SEND_EMAIL", "subject": "Follow up", "body": "Still there?"}
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Poll an enrollment until `done` accepts its view.
    async fn wait_for(router: &Router, uri: &str, done: impl Fn(&Value) -> bool) -> Value {
        for _ in 0..100 {
            let (status, body) = call(router, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::OK);
            if done(&body["data"]) {
                return body["data"].clone();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("enrollment at {uri} never reached the expected state");
    }

    #[tokio::test]
    async fn health_reports_substrate_state() {
        let app = app(true).await;
        let (status, body) = call(&app.router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["substrate"], "connected");

        let app = self::app(false).await;
        let (_, body) = call(&app.router, Method::GET, "/health", None).await;
        assert_eq!(body["substrate"], "disconnected");
    }

    #[tokio::test]
    async fn cadence_crud_round_trip() {
        let app = app(true).await;
        let id = create_welcome_cadence(&app.router).await;
        let uri = format!("/api/v1/cadences/{id}");

        let (status, body) = call(&app.router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["steps"].as_array().unwrap().len(), 3);
        assert_eq!(body["_links"]["self"], uri);

        let (status, body) = call(
            &app.router,
            Method::PUT,
            &uri,
            Some(json!({"name": "Renamed"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Renamed");
        assert_eq!(body["data"]["steps"].as_array().unwrap().len(), 3);

        let (_, body) = call(&app.router, Method::GET, "/api/v1/cadences", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, _) = call(&app.router, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(&app.router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["code"], "CADENCE_NOT_FOUND");
    }

    #[tokio::test]
    async fn blank_cadence_name_is_rejected() {
        let app = app(true).await;
        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/v1/cadences",
            Some(json!({"name": "  ", "steps": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn fractional_waits_are_accepted_and_negative_ones_rejected() {
        let app = app(true).await;
        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/v1/cadences",
            Some(json!({
                "name": "Quick",
                "steps": [{"id": "w1", "type": "WAIT", "seconds": 0.5}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["steps"][0]["durationSeconds"], 0.5);

        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/v1/cadences",
            Some(json!({
                "name": "Broken",
                "steps": [{"id": "w1", "type": "WAIT", "durationSeconds": -1}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "VALIDATION_ERROR");
        assert!(
            body["errors"][0]["message"]
                .as_str()
                .unwrap()
                .contains("durationSeconds")
        );
    }

    #[tokio::test]
    async fn enrollment_runs_and_accepts_mutation() {
        let app = app(true).await;
        let cadence_id = create_welcome_cadence(&app.router).await;

        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/v1/enrollments",
            Some(json!({"cadenceId": cadence_id, "contactEmail": "ada@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let enrollment_id = body["data"]["id"].as_str().unwrap().to_string();
        assert!(
            body["data"]["workflowId"]
                .as_str()
                .unwrap()
                .ends_with(&enrollment_id)
        );
        let uri = format!("/api/v1/enrollments/{enrollment_id}");

        // first send done, parked on the wait step
        let view = wait_for(&app.router, &uri, |d| d["cursor"] == 1).await;
        assert_eq!(view["status"], "RUNNING");
        assert_eq!(view["version"], 1);

        let (status, body) = call(
            &app.router,
            Method::POST,
            &format!("{uri}/update-cadence"),
            Some(json!({"steps": [{"id": "n1", "type": "SEND_EMAIL", "subject": "New", "body": ""}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["success"], true);

        let view = wait_for(&app.router, &uri, |d| d["status"] == "COMPLETED").await;
        assert_eq!(view["version"], 2);
        assert_eq!(view["actions"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_ids_return_not_found_codes() {
        let app = app(true).await;

        let (status, body) = call(&app.router, Method::GET, "/api/v1/enrollments/enr_nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["code"], "ENROLLMENT_NOT_FOUND");

        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/v1/enrollments",
            Some(json!({"cadenceId": "cad_nope", "contactEmail": "ada@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["code"], "CADENCE_NOT_FOUND");
    }

    #[tokio::test]
    async fn enrollment_requires_connected_substrate() {
        let app = app(false).await;
        let cadence_id = create_welcome_cadence(&app.router).await;
        assert!(!app.connection.is_connected());

        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/v1/enrollments",
            Some(json!({"cadenceId": cadence_id, "contactEmail": "ada@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["errors"][0]["code"], "SUBSTRATE_UNAVAILABLE");
    }
}
