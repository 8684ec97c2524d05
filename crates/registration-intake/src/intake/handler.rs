use std::fmt;
use std::sync::Arc;

use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use bytes::Bytes;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::email::{compose, Envelope};
use super::mailer::{MailError, Mailer};
use super::multipart::parse_submission;
use super::submission::AttachmentRole;
use super::workbook::{workbook_filename, RegistrationRecord};
use crate::config::IntakePolicy;

pub const SUCCESS_MESSAGE: &str = "הטופס נשלח בהצלחה";

/// Terminal failures of a single submission. None are retried.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Server configuration error - please contact administrator")]
    ConfigurationMissing,
    #[error("Missing {0}")]
    MissingAttachment(AttachmentRole),
    #[error("request body is not valid base64: {0}")]
    BodyDecode(#[from] base64::DecodeError),
    #[error(transparent)]
    BodyParse(#[from] multer::Error),
    #[error("unable to generate workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
    #[error(transparent)]
    Mail(#[from] MailError),
}

impl IntakeError {
    pub fn status(&self) -> StatusCode {
        match self {
            IntakeError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            IntakeError::MissingAttachment(_) => StatusCode::BAD_REQUEST,
            IntakeError::ConfigurationMissing
            | IntakeError::BodyDecode(_)
            | IntakeError::BodyParse(_)
            | IntakeError::Workbook(_)
            | IntakeError::Mail(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Per-request progress, logged as the handler advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ParsingBody,
    AwaitingCompletion,
    ComposingArtifacts,
    Sending,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Idle => "idle",
            Stage::ParsingBody => "parsing_body",
            Stage::AwaitingCompletion => "awaiting_completion",
            Stage::ComposingArtifacts => "composing_artifacts",
            Stage::Sending => "sending",
        };
        f.write_str(label)
    }
}

/// How the request body arrived.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Raw(Bytes),
    /// Serverless gateways deliver binary bodies as base64 text.
    Base64(String),
}

impl RequestBody {
    fn decode(self) -> Result<Bytes, base64::DecodeError> {
        match self {
            RequestBody::Raw(bytes) => Ok(bytes),
            RequestBody::Base64(text) => base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map(Bytes::from),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntakeRequest {
    pub method: Method,
    pub content_type: Option<String>,
    pub body: RequestBody,
}

/// JSON body returned to the form client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeResponse {
    pub status: StatusCode,
    /// `None` for the empty preflight answer.
    pub reply: Option<IntakeReply>,
    pub cors: bool,
}

pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-headers", "Content-Type"),
    ("access-control-allow-methods", "POST, OPTIONS"),
];

impl IntakeResponse {
    fn preflight(cors: bool) -> Self {
        Self {
            status: StatusCode::OK,
            reply: None,
            cors,
        }
    }

    fn sent(cors: bool) -> Self {
        Self {
            status: StatusCode::OK,
            reply: Some(IntakeReply {
                success: true,
                message: Some(SUCCESS_MESSAGE.to_string()),
                error: None,
            }),
            cors,
        }
    }

    pub fn failure(status: StatusCode, error: impl Into<String>, cors: bool) -> Self {
        Self {
            status,
            reply: Some(IntakeReply {
                success: false,
                message: None,
                error: Some(error.into()),
            }),
            cors,
        }
    }

    /// Header pairs to emit alongside the body.
    pub fn headers(&self) -> Vec<(&'static str, &'static str)> {
        let mut headers = Vec::with_capacity(4);
        if self.reply.is_some() {
            headers.push(("content-type", "application/json"));
        }
        if self.cors {
            headers.extend(CORS_HEADERS);
        }
        headers
    }

    pub fn body_text(&self) -> String {
        match &self.reply {
            Some(reply) => serde_json::to_string(reply).unwrap_or_default(),
            None => String::new(),
        }
    }
}

impl IntoResponse for IntakeResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body_text()).into_response();
        let headers = response.headers_mut();
        headers.remove(header::CONTENT_TYPE);
        for (name, value) in self.headers() {
            headers.insert(name, header::HeaderValue::from_static(value));
        }
        response
    }
}

struct Delivery<M> {
    envelope: Envelope,
    mailer: Arc<M>,
}

/// One-shot processor for registration submissions.
///
/// Holds no per-request state; the same instance serves every request.
pub struct SubmissionHandler<M> {
    delivery: Option<Delivery<M>>,
    policy: IntakePolicy,
}

impl<M> SubmissionHandler<M>
where
    M: Mailer + 'static,
{
    pub fn new(envelope: Envelope, mailer: Arc<M>, policy: IntakePolicy) -> Self {
        Self {
            delivery: Some(Delivery { envelope, mailer }),
            policy,
        }
    }

    /// A handler without mail settings. Every POST answers with the
    /// configuration error.
    pub fn unconfigured(policy: IntakePolicy) -> Self {
        Self {
            delivery: None,
            policy,
        }
    }

    pub fn policy(&self) -> IntakePolicy {
        self.policy
    }

    pub async fn handle(&self, request: IntakeRequest) -> IntakeResponse {
        let cors = self.policy.cors;
        if request.method == Method::OPTIONS {
            return IntakeResponse::preflight(cors);
        }

        match self.process(request).await {
            Ok(()) => {
                info!("registration email sent");
                IntakeResponse::sent(cors)
            }
            Err(err) => {
                match &err {
                    IntakeError::MethodNotAllowed | IntakeError::MissingAttachment(_) => {
                        warn!(error = %err, "submission rejected")
                    }
                    _ => error!(error = %err, "submission failed"),
                }
                IntakeResponse::failure(err.status(), err.to_string(), cors)
            }
        }
    }

    async fn process(&self, request: IntakeRequest) -> Result<(), IntakeError> {
        let mut stage = Stage::Idle;
        debug!(%stage, method = %request.method, "submission received");

        if request.method != Method::POST {
            return Err(IntakeError::MethodNotAllowed);
        }
        let delivery = self.delivery.as_ref().ok_or_else(|| {
            error!("mail delivery is not configured");
            IntakeError::ConfigurationMissing
        })?;

        stage = Stage::ParsingBody;
        debug!(%stage, "stage entered");
        let body = request.body.decode()?;
        let submission = parse_submission(body, request.content_type.as_deref()).await?;

        stage = Stage::AwaitingCompletion;
        debug!(
            %stage,
            files = ?submission
                .files
                .iter()
                .map(|file| format!("{} ({})", file.field_name, file.filename))
                .collect::<Vec<_>>(),
            ignored_fields = submission.ignored_fields.len(),
            "body parsed"
        );
        let resolved = submission
            .resolve(self.policy.require_id_card)
            .map_err(IntakeError::MissingAttachment)?;

        stage = Stage::ComposingArtifacts;
        debug!(%stage, "stage entered");
        let now = Local::now();
        let workbook = RegistrationRecord::from_submission(&resolved, &now).to_xlsx()?;
        let email = compose(
            &delivery.envelope,
            &resolved,
            workbook_filename(&now),
            workbook,
            &now,
        );

        stage = Stage::Sending;
        debug!(%stage, attachments = email.attachments.len(), "dispatching email");
        delivery.mailer.send(email).await?;
        Ok(())
    }
}
