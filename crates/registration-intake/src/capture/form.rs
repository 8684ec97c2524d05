use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{info, warn};
use url::Url;

use super::id_card::{IdCardPreview, SelectedFile, MAX_ID_CARD_BYTES};
use super::signature_pad::SignaturePad;
use crate::intake::{AttachmentRole, IntakeReply};

pub const SUBMITTING_LABEL: &str = "שולח...";
pub const MISSING_ID_CARD: &str = "אנא העלה תמונת תעודת זהות לפני השליחה.";
pub const ID_CARD_TOO_LARGE: &str = "גודל הקובץ גדול מדי. אנא העלה קובץ קטן מ-5MB.";
pub const MISSING_SIGNATURE: &str = "אנא חתום בטופס לפני השליחה.";
pub const SERVER_UNREACHABLE: &str = "⚠️ שגיאה בשליחה לשרת. אנא נסה שוב או פנה לתמיכה.";
pub const UNKNOWN_ERROR: &str = "שגיאה לא ידועה";
pub const DEFAULT_CONFIRMATION_PATH: &str = "/success.html";

/// Message shown when the server answered but refused the submission.
pub fn server_error(detail: Option<&str>) -> String {
    format!("⚠️ שגיאה בשליחה: {}", detail.unwrap_or(UNKNOWN_ERROR))
}

/// Visible state of the submit button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitControl {
    pub disabled: bool,
    pub label: String,
}

/// Single in-flight flag shared by every trigger of the submit action.
#[derive(Debug)]
pub struct SubmissionGuard {
    in_flight: AtomicBool,
    idle_label: String,
    control: Mutex<SubmitControl>,
}

impl SubmissionGuard {
    pub fn new(label: impl Into<String>) -> Self {
        let idle_label = label.into();
        Self {
            in_flight: AtomicBool::new(false),
            control: Mutex::new(SubmitControl {
                disabled: false,
                label: idle_label.clone(),
            }),
            idle_label,
        }
    }

    /// Claims the flag, or returns `None` while another submission runs.
    pub fn try_begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        *self.control() = SubmitControl {
            disabled: true,
            label: SUBMITTING_LABEL.to_string(),
        };
        Some(InFlight {
            guard: self,
            settled: false,
        })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn control_state(&self) -> SubmitControl {
        self.control().clone()
    }

    fn control(&self) -> MutexGuard<'_, SubmitControl> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn restore(&self) {
        *self.control() = SubmitControl {
            disabled: false,
            label: self.idle_label.clone(),
        };
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Held for the duration of one submission. Dropping it without calling
/// [`InFlight::succeed`] re-enables the submit control.
#[derive(Debug)]
pub struct InFlight<'a> {
    guard: &'a SubmissionGuard,
    settled: bool,
}

impl InFlight<'_> {
    /// Keeps the control disabled; the client is about to navigate away.
    pub fn succeed(mut self) {
        self.settled = true;
    }

    pub fn fail(self) {}
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.guard.restore();
        }
    }
}

/// Everything posted to the intake endpoint.
#[derive(Debug, Clone)]
pub struct FormPayload {
    pub fields: Vec<(String, String)>,
    pub id_card: Option<SelectedFile>,
    pub signature_png: Vec<u8>,
}

/// How the server judged a submission that reached it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerVerdict {
    Accepted { redirect: Url },
    Refused { error: Option<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response body was not valid JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Transport used by [`RegistrationForm::submit`].
#[async_trait]
pub trait SubmissionClient: Send + Sync {
    async fn submit(&self, payload: FormPayload) -> Result<ServerVerdict, ClientError>;
}

/// HTTP client posting the form as `multipart/form-data`.
#[derive(Debug, Clone)]
pub struct FormClient {
    http: reqwest::Client,
    endpoint: Url,
    confirmation: Url,
}

impl FormClient {
    pub fn new(endpoint: Url) -> Result<Self, ClientError> {
        let confirmation = endpoint.join(DEFAULT_CONFIRMATION_PATH)?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            confirmation,
        })
    }

    pub fn with_confirmation_path(mut self, path: &str) -> Result<Self, ClientError> {
        self.confirmation = self.endpoint.join(path)?;
        Ok(self)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn multipart(payload: FormPayload) -> Result<Form, ClientError> {
        let mut form = payload
            .fields
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        if let Some(id_card) = payload.id_card {
            let part = Part::bytes(id_card.content.to_vec())
                .file_name(id_card.filename)
                .mime_str(&id_card.content_type)?;
            form = form.part(AttachmentRole::ID_CARD_FIELD, part);
        }

        let signature = Part::bytes(payload.signature_png)
            .file_name(AttachmentRole::SIGNATURE_FILENAME)
            .mime_str(mime::IMAGE_PNG.as_ref())?;
        Ok(form.part(AttachmentRole::SIGNATURE_FIELD, signature))
    }
}

#[async_trait]
impl SubmissionClient for FormClient {
    async fn submit(&self, payload: FormPayload) -> Result<ServerVerdict, ClientError> {
        let form = Self::multipart(payload)?;
        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        let reply: IntakeReply = serde_json::from_slice(&body)?;

        if status.is_success() && reply.success {
            Ok(ServerVerdict::Accepted {
                redirect: self.confirmation.clone(),
            })
        } else {
            Ok(ServerVerdict::Refused { error: reply.error })
        }
    }
}

/// Result of pressing submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Navigate(Url),
    Failed(String),
    AlreadySubmitting,
}

/// Registration form state: fields, ID card, signature and submit control.
#[derive(Debug)]
pub struct RegistrationForm {
    fields: Vec<(String, String)>,
    id_card: IdCardPreview,
    signature: SignaturePad,
    require_id_card: bool,
    guard: SubmissionGuard,
    error: Mutex<String>,
}

impl RegistrationForm {
    pub fn new(signature: SignaturePad, submit_label: impl Into<String>) -> Self {
        Self {
            fields: Vec::new(),
            id_card: IdCardPreview::default(),
            signature,
            require_id_card: true,
            guard: SubmissionGuard::new(submit_label),
            error: Mutex::new(String::new()),
        }
    }

    pub fn require_id_card(mut self, required: bool) -> Self {
        self.require_id_card = required;
        self
    }

    /// Sets a field, replacing an earlier value with the same name.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Unchecked boxes and cleared inputs are not posted.
    pub fn remove_field(&mut self, name: &str) {
        self.fields.retain(|(existing, _)| existing != name);
    }

    pub fn id_card(&self) -> &IdCardPreview {
        &self.id_card
    }

    pub fn id_card_mut(&mut self) -> &mut IdCardPreview {
        &mut self.id_card
    }

    pub fn signature(&self) -> &SignaturePad {
        &self.signature
    }

    pub fn signature_mut(&mut self) -> &mut SignaturePad {
        &mut self.signature
    }

    pub fn control(&self) -> SubmitControl {
        self.guard.control_state()
    }

    pub fn error_message(&self) -> String {
        self.error.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn show_error(&self, message: &str) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = message.to_string();
    }

    /// Validates locally, then posts through `client`.
    pub async fn submit<C>(&self, client: &C) -> SubmitOutcome
    where
        C: SubmissionClient + ?Sized,
    {
        self.show_error("");
        let Some(in_flight) = self.guard.try_begin() else {
            return SubmitOutcome::AlreadySubmitting;
        };

        let payload = match self.payload() {
            Ok(payload) => payload,
            Err(message) => {
                self.show_error(&message);
                in_flight.fail();
                return SubmitOutcome::Failed(message);
            }
        };

        match client.submit(payload).await {
            Ok(ServerVerdict::Accepted { redirect }) => {
                info!(%redirect, "registration accepted");
                in_flight.succeed();
                SubmitOutcome::Navigate(redirect)
            }
            Ok(ServerVerdict::Refused { error }) => {
                let message = server_error(error.as_deref());
                warn!(reason = %message, "registration refused");
                self.show_error(&message);
                in_flight.fail();
                SubmitOutcome::Failed(message)
            }
            Err(err) => {
                warn!(error = %err, "registration could not be delivered");
                self.show_error(SERVER_UNREACHABLE);
                in_flight.fail();
                SubmitOutcome::Failed(SERVER_UNREACHABLE.to_string())
            }
        }
    }

    fn payload(&self) -> Result<FormPayload, String> {
        let id_card = self.id_card.file().cloned();
        match &id_card {
            None if self.require_id_card => return Err(MISSING_ID_CARD.to_string()),
            Some(file) if file.size() > MAX_ID_CARD_BYTES => {
                return Err(ID_CARD_TOO_LARGE.to_string())
            }
            _ => {}
        }

        let blank = self
            .signature
            .is_blank()
            .map_err(|err| server_error(Some(&err.to_string())))?;
        if blank {
            return Err(MISSING_SIGNATURE.to_string());
        }
        let signature_png = self
            .signature
            .to_png()
            .map_err(|err| server_error(Some(&err.to_string())))?;

        Ok(FormPayload {
            fields: self.fields.clone(),
            id_card,
            signature_png,
        })
    }
}
