//! Client side of the registration form: signature capture, ID-card preview
//! and the guarded submit flow.

pub mod form;
pub mod id_card;
pub mod signature_pad;

pub use form::{
    server_error, ClientError, FormClient, FormPayload, InFlight, RegistrationForm,
    ServerVerdict, SubmissionClient, SubmissionGuard, SubmitControl, SubmitOutcome,
    DEFAULT_CONFIRMATION_PATH, ID_CARD_TOO_LARGE, MISSING_ID_CARD, MISSING_SIGNATURE,
    SERVER_UNREACHABLE, SUBMITTING_LABEL, UNKNOWN_ERROR,
};
pub use id_card::{IdCardPreview, SelectedFile, MAX_ID_CARD_BYTES};
pub use signature_pad::{CanvasRect, EventDisposition, PadEvent, Point, SignaturePad};
