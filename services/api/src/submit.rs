use crate::infra::parse_field;
use clap::Args;
use registration_intake::capture::{
    FormClient, PadEvent, Point, RegistrationForm, SignaturePad, SubmitOutcome,
    DEFAULT_CONFIRMATION_PATH,
};
use registration_intake::error::AppError;
use std::path::PathBuf;
use url::Url;

const PAD_WIDTH: u32 = 400;
const PAD_HEIGHT: u32 = 150;

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    /// Intake endpoint, e.g. http://127.0.0.1:3000/api/v1/registrations
    #[arg(long)]
    pub(crate) endpoint: Url,
    /// Form field as NAME=VALUE; repeat for each field
    #[arg(long = "field", value_parser = parse_field)]
    pub(crate) fields: Vec<(String, String)>,
    /// ID-card image to upload
    #[arg(long)]
    pub(crate) id_card: Option<PathBuf>,
    /// PNG signature to load onto the pad (a sample stroke is drawn otherwise)
    #[arg(long)]
    pub(crate) signature: Option<PathBuf>,
    /// Page to open after a successful submission
    #[arg(long, default_value = DEFAULT_CONFIRMATION_PATH)]
    pub(crate) confirmation_path: String,
    /// Allow submitting without an ID card
    #[arg(long)]
    pub(crate) id_card_optional: bool,
}

pub(crate) async fn run_submit(args: SubmitArgs) -> Result<(), AppError> {
    let SubmitArgs {
        endpoint,
        fields,
        id_card,
        signature,
        confirmation_path,
        id_card_optional,
    } = args;

    let pad = match signature {
        Some(path) => {
            let bytes = tokio::fs::read(path).await?;
            SignaturePad::from_image(image::load_from_memory(&bytes)?.to_rgba8())
        }
        None => sample_signature(),
    };

    let mut form = RegistrationForm::new(pad, "שליחה").require_id_card(!id_card_optional);
    for (name, value) in fields {
        form.set_field(name, value);
    }
    if let Some(path) = id_card {
        form.id_card_mut().select(path).await?;
    }

    let client = FormClient::new(endpoint)?.with_confirmation_path(&confirmation_path)?;
    println!("Submitting registration to {}", client.endpoint());

    match form.submit(&client).await {
        SubmitOutcome::Navigate(url) => println!("Submitted. Confirmation page: {url}"),
        SubmitOutcome::Failed(message) => println!("Submission failed: {message}"),
        SubmitOutcome::AlreadySubmitting => println!("A submission is already in progress"),
    }
    Ok(())
}

fn sample_signature() -> SignaturePad {
    let mut pad = SignaturePad::new(PAD_WIDTH, PAD_HEIGHT);
    pad.handle(PadEvent::MouseDown(Point::new(40.0, 100.0)));
    for (x, y) in [(90.0, 40.0), (140.0, 110.0), (200.0, 50.0), (260.0, 105.0), (330.0, 60.0)] {
        pad.handle(PadEvent::MouseMove(Point::new(x, y)));
    }
    pad.handle(PadEvent::MouseUp);
    pad
}
