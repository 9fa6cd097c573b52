use crate::middleware::{AuthState, authenticate};
use crate::state::AppState;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Debug, serde::Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    pub status: String,
}

/// Assembles the full HTTP surface: identity and dispatch routes behind
/// the authentication layer, plus health and a JSON 404 fallback.
pub fn build_router(state: AppState, auth: Arc<AuthState>) -> Router {
    let auth_layer = axum::middleware::from_fn_with_state(auth, authenticate);

    Router::new()
        .merge(identity::rpc::users::router(state.identity))
        .merge(dispatch::rpc::router(state.dispatch))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(auth_layer)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn not_found() -> Response {
    let body = identity::rpc::ErrorResponse {
        error: identity::rpc::ErrorDetail {
            error_code: "NOT_FOUND".to_string(),
            message: "no such route".to_string(),
        },
    };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
