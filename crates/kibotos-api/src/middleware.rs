//! Request-id tagging and the admin bearer-token guard.

use axum::body::Body;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

use crate::state::AppState;

/// Per-request UUID, attached to the tracing span and echoed back in every
/// `ErrorBody`. Generated at the edge rather than trusted from a client
/// header, since callers are untrusted miners and workers.
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestId>()
            .copied()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "missing request id"))
    }
}

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = RequestId(Uuid::new_v4());
    request.extensions_mut().insert(request_id);

    let span = tracing::info_span!("request", request_id = %request_id.0, path = %request.uri().path());

    let mut response = next.run(request).instrument(span).await;
    response
        .headers_mut()
        .insert("x-request-id", request_id.0.to_string().parse().unwrap());
    response
}

/// Gates `POST /v1/admin/*` behind `Authorization: Bearer <KIBOTOS_ADMIN_TOKEN>`.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == state.admin_token.as_str() => Ok(next.run(request).await),
        _ => Ok(unauthorized()),
    }
}

fn unauthorized() -> Response {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .body(Body::from("unauthorized"))
        .expect("static response is well-formed")
}
