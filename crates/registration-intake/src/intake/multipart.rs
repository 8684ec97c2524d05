use std::convert::Infallible;

use bytes::Bytes;
use multer::Multipart;
use tracing::debug;

use super::submission::{Submission, UploadedFile};

/// Parses a complete `multipart/form-data` body into a [`Submission`].
///
/// All parts are buffered before returning, so callers only ever observe a
/// finished parse. Parts with a filename are uploads; the rest are fields.
/// An empty file input (blank filename, no bytes) is skipped.
pub async fn parse_submission(
    body: Bytes,
    content_type: Option<&str>,
) -> Result<Submission, multer::Error> {
    let content_type = content_type.ok_or(multer::Error::NoMultipart)?;
    let boundary = multer::parse_boundary(content_type)?;
    let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = Multipart::new(stream, boundary);

    let mut submission = Submission::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_owned) {
            Some(filename) => {
                let content_type = field
                    .content_type()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());
                let content = field.bytes().await?;
                if filename.is_empty() && content.is_empty() {
                    debug!(field = %name, "skipping empty file input");
                    continue;
                }
                debug!(field = %name, %filename, bytes = content.len(), "file part buffered");
                submission.files.push(UploadedFile {
                    field_name: name,
                    filename,
                    content_type,
                    content,
                });
            }
            None => {
                let value = field.text().await?;
                if !submission.fields.assign(&name, value) {
                    debug!(field = %name, "ignoring unknown form field");
                    submission.ignored_fields.push(name);
                }
            }
        }
    }

    Ok(submission)
}
