use crate::infra::AppState;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use registration_intake::error::AppError;
use registration_intake::intake::{
    intake_router, invoke, FunctionEvent, FunctionResponse, Mailer, SubmissionHandler,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) const FUNCTION_EVENT_PATH: &str = "/api/v1/function-events";
/// Room for the JSON envelope and headers around the encoded body.
const EVENT_ENVELOPE_OVERHEAD: usize = 64 * 1024;

/// Events carry the multipart body base64-encoded, four bytes per three.
pub(crate) fn function_event_limit(max_body_bytes: usize) -> usize {
    max_body_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(EVENT_ENVELOPE_OVERHEAD)
}

pub(crate) fn with_intake_routes<M>(handler: Arc<SubmissionHandler<M>>) -> Router
where
    M: Mailer + 'static,
{
    let event_limit = function_event_limit(handler.policy().max_body_bytes);
    intake_router(handler.clone())
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route(
            FUNCTION_EVENT_PATH,
            post(function_event_endpoint::<M>).layer(DefaultBodyLimit::max(event_limit)),
        )
        .layer(Extension(handler))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Accepts a gateway event forwarded as JSON and answers with the gateway
/// response envelope.
pub(crate) async fn function_event_endpoint<M>(
    Extension(handler): Extension<Arc<SubmissionHandler<M>>>,
    body: Bytes,
) -> Result<Json<FunctionResponse>, AppError>
where
    M: Mailer + 'static,
{
    let event: FunctionEvent = serde_json::from_slice(&body)?;
    Ok(Json(invoke(&*handler, event).await))
}
