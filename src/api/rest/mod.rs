pub mod admin;
pub mod couriers;
pub mod users;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::engine::bounded;
use crate::error::AppError;
use crate::security::authorization::Actor;
use crate::state::AppState;

/// Ambient identity header. Header names are case-insensitive on the wire.
pub const USER_ID_HEADER: &str = "userid";

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .merge(users::router())
        .merge(couriers::router())
        .merge(admin::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match HeaderValue::from_str(origin) {
        Ok(value) => AllowOrigin::exact(value),
        Err(err) => {
            warn!(origin, error = %err, "invalid CORS origin; cross-origin requests disabled");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)])
}

pub(crate) fn user_id_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// The user named by the identity header, or anonymous when it is absent or
/// malformed.
pub(crate) fn user_actor(headers: &HeaderMap) -> Actor {
    crate::engine::parse_user_id(user_id_header(headers))
        .map(Actor::User)
        .unwrap_or(Actor::Anonymous)
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    users: usize,
    couriers: usize,
    orders: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    let limit = state.config.store_timeout;

    Ok(Json(HealthResponse {
        status: "ok",
        users: bounded(limit, state.identities.user_count()).await?,
        couriers: bounded(limit, state.identities.courier_count()).await?,
        orders: bounded(limit, state.orders.count()).await?,
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
