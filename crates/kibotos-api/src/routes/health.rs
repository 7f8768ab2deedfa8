use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use kibotos_types::StatusView;

use crate::state::AppState;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn status() -> Json<StatusView> {
    Json(StatusView {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: option_env!("KIBOTOS_BUILD_SHA").unwrap_or("unknown").to_string(),
    })
}

pub async fn metrics(State(_state): State<AppState>) -> impl IntoResponse {
    match kibotos_telemetry::metrics::encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {err}"),
        )
            .into_response(),
    }
}
