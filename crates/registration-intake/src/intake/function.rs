use std::collections::{BTreeMap, HashMap};

use axum::http::Method;
use serde::{Deserialize, Serialize};

use super::handler::{IntakeRequest, RequestBody, SubmissionHandler};
use super::mailer::Mailer;

/// Event shape delivered by serverless HTTP gateways.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEvent {
    pub http_method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default = "base64_by_default")]
    pub is_base64_encoded: bool,
}

fn base64_by_default() -> bool {
    true
}

impl FunctionEvent {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn into_request(self) -> IntakeRequest {
        // A method token that fails to parse can only be answered with 405.
        let method = Method::from_bytes(self.http_method.trim().as_bytes())
            .unwrap_or(Method::TRACE);
        let content_type = self.header("content-type").map(str::to_owned);
        let body = self.body.unwrap_or_default();
        let body = if self.is_base64_encoded {
            RequestBody::Base64(body)
        } else {
            RequestBody::Raw(body.into_bytes().into())
        };

        IntakeRequest {
            method,
            content_type,
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Runs one gateway event through the handler.
pub async fn invoke<M>(handler: &SubmissionHandler<M>, event: FunctionEvent) -> FunctionResponse
where
    M: Mailer + 'static,
{
    let response = handler.handle(event.into_request()).await;
    FunctionResponse {
        status_code: response.status.as_u16(),
        headers: response
            .headers()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        body: response.body_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntakePolicy;
    use crate::intake::mailer::{MailError, Mailer};
    use crate::intake::OutgoingEmail;
    use async_trait::async_trait;

    struct UnreachableMailer;

    #[async_trait]
    impl Mailer for UnreachableMailer {
        async fn send(&self, _email: OutgoingEmail) -> Result<(), MailError> {
            Err(MailError::Transport("unreachable".to_string()))
        }
    }

    #[test]
    fn event_defaults_to_base64_body() {
        let event: FunctionEvent = serde_json::from_str(
            r#"{"httpMethod":"POST","headers":{"Content-Type":"multipart/form-data; boundary=x"},"body":"LS14LS0="}"#,
        )
        .expect("event parses");
        let request = event.into_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.content_type.as_deref(),
            Some("multipart/form-data; boundary=x")
        );
        assert!(matches!(request.body, RequestBody::Base64(_)));
    }

    #[tokio::test]
    async fn get_event_yields_405_with_cors() {
        let handler = SubmissionHandler::<UnreachableMailer>::unconfigured(IntakePolicy::default());
        let event: FunctionEvent =
            serde_json::from_str(r#"{"httpMethod":"GET"}"#).expect("event parses");

        let response = invoke(&handler, event).await;

        assert_eq!(response.status_code, 405);
        assert_eq!(
            response.headers.get("access-control-allow-methods").map(String::as_str),
            Some("POST, OPTIONS")
        );
        let body: serde_json::Value = serde_json::from_str(&response.body).expect("json body");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Method Not Allowed");
    }
}
