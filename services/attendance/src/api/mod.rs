//! HTTP API handlers and routing.

pub mod error;
mod health;
mod reports;
pub mod request_context;
mod tokens;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderName, Method},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::state::AppState;
use error::ApiError;
use request_context::{RequestContext, REQUEST_ID_HEADER};

/// Create the main API router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(health::routes())
        .nest("/api", reports::routes().merge(tokens::routes()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

/// Unwraps a JSON body, turning extractor rejections into problem responses.
pub(crate) fn json_body<T>(
    body: Result<Json<T>, JsonRejection>,
    ctx: &RequestContext,
) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        ApiError::bad_request("invalid_body", rejection.body_text())
            .with_request_id(ctx.request_id.clone())
    })
}
