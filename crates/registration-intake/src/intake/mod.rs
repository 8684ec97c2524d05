//! Server side of the registration form: parse, validate, build the workbook
//! and mail it.

pub mod email;
pub mod function;
pub mod handler;
pub mod mailer;
pub mod multipart;
pub mod router;
pub mod submission;
pub mod workbook;

pub use email::{compose, render_html, EmailAttachment, Envelope, OutgoingEmail};
pub use function::{invoke, FunctionEvent, FunctionResponse};
pub use handler::{
    IntakeError, IntakeReply, IntakeRequest, IntakeResponse, RequestBody, Stage,
    SubmissionHandler, CORS_HEADERS, SUCCESS_MESSAGE,
};
pub use mailer::{build_message, MailError, Mailer, SmtpMailer};
pub use multipart::parse_submission;
pub use router::{intake_router, LEGACY_FUNCTION_PATH, SUBMIT_PATH};
pub use submission::{
    AttachmentRole, RegistrationFields, ResolvedSubmission, Submission, UploadedFile,
};
pub use workbook::{
    workbook_filename, RegistrationRecord, PROGRAMME, SHEET_NAME, WORKBOOK_CONTENT_TYPE,
};
