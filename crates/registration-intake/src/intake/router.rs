use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};

use super::handler::{IntakeRequest, IntakeResponse, RequestBody, SubmissionHandler};
use super::mailer::Mailer;

pub const SUBMIT_PATH: &str = "/api/v1/registrations";
/// Path the form posted to when it was hosted as a serverless function.
pub const LEGACY_FUNCTION_PATH: &str = "/.netlify/functions/sendEmail";

/// Router exposing the submission handler. Every method is routed so the
/// handler itself answers preflights and 405s.
pub fn intake_router<M>(handler: Arc<SubmissionHandler<M>>) -> Router
where
    M: Mailer + 'static,
{
    let body_limit = handler.policy().max_body_bytes;
    Router::new()
        .route(SUBMIT_PATH, any(submit_handler::<M>))
        .route(LEGACY_FUNCTION_PATH, any(submit_handler::<M>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(handler)
}

pub(crate) async fn submit_handler<M>(
    State(handler): State<Arc<SubmissionHandler<M>>>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response
where
    M: Mailer + 'static,
{
    let body = match body {
        Ok(bytes) => bytes,
        Err(rejection) if method == Method::POST => {
            return IntakeResponse::failure(
                rejection.status(),
                rejection.body_text(),
                handler.policy().cors,
            )
            .into_response();
        }
        Err(_) => Bytes::new(),
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    handler
        .handle(IntakeRequest {
            method,
            content_type,
            body: RequestBody::Raw(body),
        })
        .await
        .into_response()
}
