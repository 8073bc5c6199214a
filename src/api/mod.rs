//! Tempora REST API
//!
//! HTTP API layer for Tempora, built with Axum.
//!
//! # Endpoints
//!
//! ## Clocks
//! - `GET /api/clocks` - Current analysis report
//! - `POST /api/clocks` - Register a clock
//! - `PUT /api/clocks/:id` - Rename a clock and set its time
//! - `DELETE /api/clocks/:id` - Remove a clock
//! - `GET /api/recommendations` - Per-clock adjustment advice
//!
//! ## Reference
//! - `POST /api/sync` - Set the reference to the current time
//! - `PUT /api/reference` - Set the reference explicitly
//! - `POST /api/drift` - Shift clocks by minute deltas (admin)
//!
//! ## State
//! - `GET /api/state` - Export registry state
//! - `POST /api/state` - Import registry state (admin)
//! - `GET /api/history` - Analysis and activity history
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /ws` - Real-time push channel
//!
//! Admin routes expect the password in the `x-admin-password` header.
//!
//! # Example
//!
//! ```rust,no_run
//! use tempora::api::{serve, AppState};
//! use tempora::clock::ClockRegistry;
//! use tempora::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let state = AppState::new(ClockRegistry::default(), config.clone());
//!     serve(state, &config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;
pub mod ticker;

pub use error::{ApiError, ApiResult};
pub use state::AppState;
pub use ticker::spawn_reference_ticker;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::Config;
use crate::websocket::websocket_handler;

/// Build the API router with all routes and middleware
pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Clock routes
        .route(
            "/clocks",
            get(routes::clocks::list_clocks).post(routes::clocks::create_clock),
        )
        .route(
            "/clocks/:id",
            put(routes::clocks::update_clock).delete(routes::clocks::delete_clock),
        )
        .route("/recommendations", get(routes::clocks::recommendations))
        // Reference routes
        .route("/sync", post(routes::sync::sync_to_current_time))
        .route("/reference", put(routes::sync::set_reference))
        .route("/drift", post(routes::sync::simulate_drift))
        // State routes
        .route(
            "/state",
            get(routes::export::export_state).post(routes::export::import_state),
        )
        .route("/history", get(routes::history::history));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    let static_dir = state.config.server.static_dir.clone();

    let router = Router::new()
        .nest("/api", api_routes)
        .nest("/health", health_routes)
        .route("/ws", get(websocket_handler));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server and the reference ticker
pub async fn serve(state: AppState, config: &Config) -> Result<(), ApiError> {
    let state = Arc::new(state);
    let ticker = spawn_reference_ticker(Arc::clone(&state));
    let router = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Tempora API listening on {}", addr);

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)));

    ticker.abort();
    result?;

    tracing::info!("Tempora API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockRegistry;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> (Router, Arc<AppState>) {
        let mut config = Config::default();
        config.sync.reference_time = Some("15:00".to_string());
        let state = Arc::new(AppState::new(ClockRegistry::default(), config));
        (build_router(Arc::clone(&state)), state)
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _) = create_test_app();
        let response = app.oneshot(get_request("/health/live")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let (app, _) = create_test_app();
        let response = app.oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["clocks"], 4);
        assert_eq!(json["reference_time"], "15:00");
        assert_eq!(json["follows_system_clock"], false);
    }

    #[tokio::test]
    async fn test_list_clocks() {
        let (app, _) = create_test_app();
        let response = app.oneshot(get_request("/api/clocks")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["referenceTime"], "15:00");
        assert_eq!(json["differences"], serde_json::json!([-15, 5, 0, -20]));
        assert_eq!(json["summary"]["synchronizationRate"], 25);
    }

    #[tokio::test]
    async fn test_create_clock() {
        let (app, state) = create_test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/clocks",
                r#"{"name": "Library", "time": "15:10", "location": "Central Library"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["clock"]["id"], 5);
        assert_eq!(json["clock"]["name"], "Library Clock");
        assert_eq!(json["analysis"]["summary"]["totalClocks"], 5);
        assert_eq!(state.registry.lock().await.len(), 5);
    }

    #[tokio::test]
    async fn test_create_clock_missing_fields() {
        let (app, _) = create_test_app();
        let response = app
            .oneshot(json_request("POST", "/api/clocks", r#"{"name": "Library"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert!(json["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_create_clock_invalid_time() {
        let (app, _) = create_test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/clocks",
                r#"{"name": "Library", "time": "25:00"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_TIME_FORMAT");
    }

    #[tokio::test]
    async fn test_create_clock_duplicate_id() {
        let (app, _) = create_test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/clocks",
                r#"{"id": 2, "name": "Copy Clock", "time": "12:00"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_update_clock() {
        let (app, _) = create_test_app();
        let response = app
            .oneshot(json_request(
                "PUT",
                "/api/clocks/1",
                r#"{"name": "Town Square", "time": "15:00"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["clock"]["name"], "Town Square Clock");
        assert_eq!(json["analysis"]["summary"]["synchronized"], 2);
    }

    #[tokio::test]
    async fn test_update_missing_clock() {
        let (app, _) = create_test_app();
        let response = app
            .oneshot(json_request(
                "PUT",
                "/api/clocks/99",
                r#"{"name": "Ghost Clock", "time": "15:00"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_clock() {
        let (app, state) = create_test_app();
        let response = app
            .oneshot(json_request("DELETE", "/api/clocks/4", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.registry.lock().await.get(4).is_none());
    }

    #[tokio::test]
    async fn test_delete_invalid_and_missing_ids() {
        let (app, _) = create_test_app();
        let response = app
            .clone()
            .oneshot(json_request("DELETE", "/api/clocks/abc", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(json_request("DELETE", "/api/clocks/42", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "CLOCK_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_set_reference() {
        let (app, _) = create_test_app();
        let response = app
            .oneshot(json_request("PUT", "/api/reference", r#"{"time": "14:45"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["analysis"]["referenceTime"], "14:45");
        assert_eq!(json["analysis"]["differences"][0], 0);
    }

    #[tokio::test]
    async fn test_sync_to_current_time() {
        let (app, state) = create_test_app();
        let response = app
            .oneshot(json_request("POST", "/api/sync", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(
            json["analysis"]["referenceTime"],
            state.registry.lock().await.reference_time().to_string()
        );
    }

    #[tokio::test]
    async fn test_recommendations() {
        let (app, _) = create_test_app();
        let response = app.oneshot(get_request("/api/recommendations")).await.unwrap();

        let json = body_json(response).await;
        assert_eq!(
            json["recommendations"][0],
            "⏰ Town Square Clock: Move forward by 15 minutes"
        );
    }

    #[tokio::test]
    async fn test_drift_requires_password() {
        let (app, _) = create_test_app();
        let response = app
            .oneshot(json_request("POST", "/api/drift", r#"{"drift": {"1": 5}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_drift_with_password() {
        let (app, _) = create_test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/drift")
            .header("Content-Type", "application/json")
            .header("x-admin-password", "tempora123")
            .body(Body::from(r#"{"drift": {"1": 15, "99": 3}}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["shifted"], serde_json::json!([1]));
        assert_eq!(json["analysis"]["differences"][0], 0);
    }

    #[tokio::test]
    async fn test_export_import_state() {
        let (app, state) = create_test_app();
        let response = app.clone().oneshot(get_request("/api/state")).await.unwrap();
        let mut exported = body_json(response).await;
        assert_eq!(exported["referenceTime"], "15:00");
        assert_eq!(exported["clocks"].as_array().unwrap().len(), 4);

        exported["referenceTime"] = serde_json::json!("09:00");
        exported["clocks"].as_array_mut().unwrap().truncate(2);

        let request = Request::builder()
            .method("POST")
            .uri("/api/state")
            .header("Content-Type", "application/json")
            .header("x-admin-password", "tempora123")
            .body(Body::from(exported.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let registry = state.registry.lock().await;
        assert_eq!(registry.reference_time().to_string(), "09:00");
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_import_rejects_wrong_password() {
        let (app, state) = create_test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/state")
            .header("Content-Type", "application/json")
            .header("x-admin-password", "guess")
            .body(Body::from(r#"{"referenceTime": "10:00", "clocks": []}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(state.registry.lock().await.len(), 4);
    }

    #[tokio::test]
    async fn test_history_records_activity() {
        let (app, _) = create_test_app();
        app.clone()
            .oneshot(json_request("DELETE", "/api/clocks/2", ""))
            .await
            .unwrap();

        let response = app.oneshot(get_request("/api/history")).await.unwrap();
        let json = body_json(response).await;

        assert_eq!(json["activity"][0]["type"], "remove");
        assert_eq!(json["activity"][0]["clockId"], 2);
        assert!(!json["analysis"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_rejected() {
        let (app, _) = create_test_app();
        let response = app
            .oneshot(json_request("POST", "/api/clocks", "not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
