use std::fmt::Write as _;

use bytes::Bytes;
use chrono::{DateTime, TimeZone};

use super::submission::{text, AttachmentRole, RegistrationFields, ResolvedSubmission};
use super::workbook::{format_local_timestamp, WORKBOOK_CONTENT_TYPE};

pub const SUBJECT: &str = "הרשמה חדשה למכללת כנרת";
pub const ID_CARD_CID: &str = "idCard";
pub const SIGNATURE_CID: &str = "signature";

/// A message ready to hand to a [`Mailer`](super::mailer::Mailer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<EmailAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Bytes,
    /// Set for images the HTML body references as `cid:<id>`.
    pub content_id: Option<String>,
}

/// Sender and recipient for outgoing registrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub to: String,
}

/// Assembles the notification for a resolved submission.
///
/// Attachment order: workbook, ID card, remaining uploads, signature.
pub fn compose<Tz>(
    envelope: &Envelope,
    submission: &ResolvedSubmission,
    workbook_name: String,
    workbook: Vec<u8>,
    sent_at: &DateTime<Tz>,
) -> OutgoingEmail
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut attachments = Vec::with_capacity(submission.uploads.len() + 2);
    attachments.push(EmailAttachment {
        filename: workbook_name,
        content_type: WORKBOOK_CONTENT_TYPE.to_string(),
        content: Bytes::from(workbook),
        content_id: None,
    });

    if let Some(id_card) = &submission.id_card {
        attachments.push(EmailAttachment {
            filename: "idCard.jpg".to_string(),
            content_type: id_card.content_type.clone(),
            content: id_card.content.clone(),
            content_id: Some(ID_CARD_CID.to_string()),
        });
    }

    attachments.extend(submission.other_uploads().map(|file| EmailAttachment {
        filename: file.filename.clone(),
        content_type: file.content_type.clone(),
        content: file.content.clone(),
        content_id: None,
    }));

    let signature_type = match submission.signature.content_type.as_str() {
        "" => mime::IMAGE_PNG.to_string(),
        declared => declared.to_string(),
    };
    attachments.push(EmailAttachment {
        filename: AttachmentRole::SIGNATURE_FILENAME.to_string(),
        content_type: signature_type,
        content: submission.signature.content.clone(),
        content_id: Some(SIGNATURE_CID.to_string()),
    });

    OutgoingEmail {
        from: envelope.from.clone(),
        to: envelope.to.clone(),
        subject: SUBJECT.to_string(),
        html: render_html(
            &submission.fields,
            submission.id_card.is_some(),
            &format_local_timestamp(sent_at),
        ),
        attachments,
    }
}

/// Right-to-left notification body. Every submitted value is escaped.
pub fn render_html(fields: &RegistrationFields, with_id_card: bool, sent_at: &str) -> String {
    let mut html = String::new();
    html.push_str(
        "<div style=\"font-family: Arial, sans-serif; direction: rtl; text-align: right;\">\n",
    );
    html.push_str(
        "<h2 style=\"color: #1976d2; text-align: center;\">הרשמה חדשה - מכללת כנרת</h2>\n",
    );

    html.push_str("<h3 style=\"color: #333;\">פרטים אישיים:</h3>\n");
    let personal = [
        ("שם פרטי", text(&fields.first_name).to_string()),
        ("שם משפחה", text(&fields.last_name).to_string()),
        ("תעודת זהות", text(&fields.id_number).to_string()),
        ("טלפון נייד", text(&fields.phone).to_string()),
        ("תאריך לידה", fields.birth_date()),
        ("יישוב", text(&fields.city).to_string()),
        ("כתובת", text(&fields.address).to_string()),
        ("מין", text(&fields.gender).to_string()),
        ("דואר אלקטרוני", text(&fields.email).to_string()),
    ];
    for (label, value) in &personal {
        write_row(&mut html, label, value);
    }
    if let Some(advisor) = &fields.advisor_name {
        write_row(&mut html, "שם היועץ", advisor);
    }

    html.push_str("<h3 style=\"color: #333;\">הסכמות:</h3>\n");
    write_row(
        &mut html,
        "הסכמה לפרסום בפייסבוק",
        text(&fields.facebook_consent),
    );
    write_row(
        &mut html,
        "קראתי והסכמתי על כל מה שכתוב",
        if fields.agreed() { "כן" } else { "לא" },
    );

    if with_id_card {
        html.push_str("<h3 style=\"color: #333;\">תמונת תעודת זהות:</h3>\n");
        write_inline_image(&mut html, ID_CARD_CID);
    }
    html.push_str("<h3 style=\"color: #333;\">חתימה דיגיטלית:</h3>\n");
    write_inline_image(&mut html, SIGNATURE_CID);

    html.push_str("<hr style=\"margin: 20px 0;\">\n");
    writeln!(
        html,
        "<p style=\"font-size: 12px; color: #666;\">הרשמה זו נשלחה דרך טופס ההרשמה הדיגיטלי של מכללת כנרת<br>תאריך שליחה: {}</p>",
        escape_html(sent_at)
    )
    .expect("write footer");
    html.push_str("</div>\n");
    html
}

fn write_row(html: &mut String, label: &str, value: &str) {
    writeln!(
        html,
        "<p><strong>{}:</strong> {}</p>",
        label,
        escape_html(value)
    )
    .expect("write field row");
}

fn write_inline_image(html: &mut String, cid: &str) {
    writeln!(
        html,
        "<p><img src=\"cid:{cid}\" width=\"300\" style=\"border: 1px solid #ddd; padding: 10px;\"/></p>"
    )
    .expect("write inline image");
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
