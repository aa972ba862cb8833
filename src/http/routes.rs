//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::error;

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/game-state", get(game_state_handler));

    if let Some(dir) = &state.config.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `*` allows any origin, otherwise a comma-separated origin list
fn cors_layer(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    let allowed_origins: Vec<HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    cors.allow_origin(allowed_origins)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    sessions: usize,
    players: usize,
    red_score: u32,
    blue_score: u32,
    game_ended: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let summary = state.hub.summary();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        sessions: state.hub.session_count(),
        players: summary.players,
        red_score: summary.red_score,
        blue_score: summary.blue_score,
        game_ended: summary.game_ended,
    })
}

// ============================================================================
// Game state endpoint
// ============================================================================

async fn game_state_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let json = state
        .hub
        .snapshot_json()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, "application/json")], json).into_response())
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Internal(msg) => {
                error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::game::GameHub;

    fn app() -> (Router, GameHub) {
        let (hub, handle) = GameHub::new(Duration::from_millis(16));
        let state = AppState::new(Config::default(), handle);
        (build_router(state), hub)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let (app, _hub) = app();
        let (status, body) = get_json(app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 0);
        assert_eq!(body["players"], 0);
        assert_eq!(body["game_ended"], false);
    }

    #[tokio::test]
    async fn game_state_returns_full_snapshot() {
        let (app, _hub) = app();
        let (status, body) = get_json(app, "/game-state").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["redScore"], 0);
        assert_eq!(body["blueFlag"]["isAtBase"], true);
        assert_eq!(body["gameDuration"], 900_000);
        assert!(body["players"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn plain_get_on_ws_is_refused() {
        let (app, _hub) = app();
        let response = app
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found_without_static_dir() {
        let (app, _hub) = app();
        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
