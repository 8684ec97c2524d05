use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::{ContentDisposition, ContentId, ContentType};
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::email::OutgoingEmail;
use crate::config::MailConfig;

/// Outbound mail seam so the handler can run against a test double.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid mailbox '{address}': {reason}")]
    Address { address: String, reason: String },
    #[error("unable to build message: {0}")]
    Build(String),
    #[error("{0}")]
    Transport(String),
    #[error("mail transport timed out after {0:?}")]
    Timeout(Duration),
}

/// SMTP relay client authenticated with the configured account.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|err| MailError::Transport(err.to_string()))?
            .credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ))
            .timeout(Some(config.send_timeout))
            .build();

        Ok(Self {
            transport,
            timeout: config.send_timeout,
        })
    }
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let message = build_message(email)?;
        match tokio::time::timeout(self.timeout, self.transport.send(message)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(MailError::Transport(err.to_string())),
            Err(_) => Err(MailError::Timeout(self.timeout)),
        }
    }
}

/// Converts an [`OutgoingEmail`] into a MIME message.
///
/// Attachments with a content-ID join the HTML body in a `multipart/related`
/// part so the body can reference them; they keep their filename so mail
/// clients also list them as attachments. Everything else is a regular
/// attachment of the outer `multipart/mixed`.
pub fn build_message(email: OutgoingEmail) -> Result<Message, MailError> {
    let from = parse_mailbox(&email.from)?;
    let to = parse_mailbox(&email.to)?;

    let mut related = MultiPart::related().singlepart(SinglePart::html(email.html));
    let mut regular = Vec::new();

    for attachment in email.attachments {
        let content_type = ContentType::parse(&attachment.content_type).map_err(|err| {
            MailError::Build(format!(
                "{} has invalid content type '{}': {err}",
                attachment.filename, attachment.content_type
            ))
        })?;

        match attachment.content_id {
            Some(cid) => {
                let part = SinglePart::builder()
                    .header(content_type)
                    .header(ContentDisposition::inline_with_name(&attachment.filename))
                    .header(ContentId::from(format!("<{cid}>")))
                    .body(attachment.content.to_vec());
                related = related.singlepart(part);
            }
            None => regular.push(
                Attachment::new(attachment.filename).body(attachment.content.to_vec(), content_type),
            ),
        }
    }

    let body = regular
        .into_iter()
        .fold(MultiPart::mixed().multipart(related), |mixed, part| {
            mixed.singlepart(part)
        });

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject)
        .multipart(body)
        .map_err(|err| MailError::Build(err.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse::<Mailbox>().map_err(|err| MailError::Address {
        address: address.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::email::EmailAttachment;
    use bytes::Bytes;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            from: "forms@example.org".to_string(),
            to: "office@example.org".to_string(),
            subject: "New registration".to_string(),
            html: "<p><img src=\"cid:signature\"/></p>".to_string(),
            attachments: vec![
                EmailAttachment {
                    filename: "book.xlsx".to_string(),
                    content_type:
                        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                            .to_string(),
                    content: Bytes::from_static(b"PK"),
                    content_id: None,
                },
                EmailAttachment {
                    filename: "signature.png".to_string(),
                    content_type: "image/png".to_string(),
                    content: Bytes::from_static(b"png"),
                    content_id: Some("signature".to_string()),
                },
            ],
        }
    }

    #[test]
    fn inline_images_are_grouped_with_the_body() {
        let message = build_message(email()).expect("message builds");
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();

        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("multipart/related"));
        assert!(raw.contains("Content-ID: <signature>"));
        assert!(raw.contains("book.xlsx"));
        assert!(raw.contains("To: office@example.org"));
    }

    #[test]
    fn invalid_mailbox_is_reported() {
        let mut email = email();
        email.to = "not an address".to_string();
        let err = build_message(email).expect_err("recipient rejected");
        assert!(matches!(err, MailError::Address { .. }));
    }

    #[test]
    fn invalid_content_type_is_reported() {
        let mut email = email();
        email.attachments[0].content_type = "???".to_string();
        let err = build_message(email).expect_err("content type rejected");
        assert!(matches!(err, MailError::Build(_)));
    }
}
