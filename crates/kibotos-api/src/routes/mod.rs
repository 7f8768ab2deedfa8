mod admin;
mod cycles;
mod evaluate;
mod health;
mod prompts;
mod scores;
mod submissions;
mod upload;
mod weights;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::middleware::{admin_auth_middleware, request_id_middleware};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/v1/admin/prompts", post(admin::create_prompt))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/v1/health", get(health::health))
        .route("/v1/status", get(health::status))
        .route("/v1/metrics", get(health::metrics))
        .route("/v1/cycles/status", get(cycles::status))
        .route("/v1/cycles/:cycle_id", get(cycles::get_cycle))
        .route("/v1/prompts", get(prompts::list))
        .route("/v1/prompts/categories", get(prompts::categories))
        .route("/v1/prompts/:id", get(prompts::get))
        .route("/v1/upload/presign", post(upload::presign_upload))
        .route("/v1/submissions", post(submissions::create))
        .route("/v1/submissions/:uuid", get(submissions::get))
        .route("/v1/weights/latest", get(weights::latest))
        .route("/v1/weights/:cycle_id", get(weights::by_cycle))
        .route("/v1/scores/latest", get(scores::latest))
        .route("/v1/scores/:cycle_id", get(scores::by_cycle))
        .route("/v1/evaluate/fetch", post(evaluate::fetch))
        .route("/v1/evaluate/submit", post(evaluate::submit))
        .route("/v1/evaluate/renew", post(evaluate::renew))
        .route("/v1/evaluate/vlm", post(evaluate::vlm))
        .route("/v1/evaluate/dedup", post(evaluate::dedup));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
