use std::fmt;

use bytes::Bytes;
use serde::Serialize;

/// Known fields of the registration form. Each is optional because the
/// browser omits unchecked boxes and untouched inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub id_number: Option<String>,
    pub phone: Option<String>,
    pub birth_day: Option<String>,
    pub birth_month: Option<String>,
    pub birth_year: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub facebook_consent: Option<String>,
    pub agreement: Option<String>,
    pub advisor_name: Option<String>,
}

impl RegistrationFields {
    /// Stores a form value under its wire name. Returns `false` for names the
    /// form does not define. A repeated name overwrites the earlier value.
    pub fn assign(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "firstName" => &mut self.first_name,
            "lastName" => &mut self.last_name,
            "idNumber" => &mut self.id_number,
            "phone" => &mut self.phone,
            "birthDay" => &mut self.birth_day,
            "birthMonth" => &mut self.birth_month,
            "birthYear" => &mut self.birth_year,
            "city" => &mut self.city,
            "address" => &mut self.address,
            "gender" => &mut self.gender,
            "email" => &mut self.email,
            "facebookConsent" => &mut self.facebook_consent,
            "agreement" => &mut self.agreement,
            "advisorName" => &mut self.advisor_name,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// `day/month/year`, with missing parts left empty.
    pub fn birth_date(&self) -> String {
        format!(
            "{}/{}/{}",
            text(&self.birth_day),
            text(&self.birth_month),
            text(&self.birth_year)
        )
    }

    /// The agreement checkbox only posts a value when ticked. An empty value
    /// counts as not agreed.
    pub fn agreed(&self) -> bool {
        self.agreement.as_deref().is_some_and(|value| !value.is_empty())
    }
}

/// Renders an absent field as the empty string.
pub fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

/// A file part buffered from the multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field_name: String,
    pub filename: String,
    pub content_type: String,
    pub content: Bytes,
}

/// Logical purpose of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentRole {
    IdCard,
    Signature,
    Other,
}

impl AttachmentRole {
    pub const ID_CARD_FIELD: &'static str = "idCard";
    pub const SIGNATURE_FIELD: &'static str = "signature";
    pub const SIGNATURE_FILENAME: &'static str = "signature.png";
}

impl fmt::Display for AttachmentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentRole::IdCard => write!(f, "ID card"),
            AttachmentRole::Signature => write!(f, "signature"),
            AttachmentRole::Other => write!(f, "attachment"),
        }
    }
}

/// Everything a single request carried, fully buffered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub fields: RegistrationFields,
    pub files: Vec<UploadedFile>,
    pub ignored_fields: Vec<String>,
}

impl Submission {
    /// Assigns roles to the uploads.
    ///
    /// The signature is the part posted under the `signature` field; only when
    /// no such part exists is a file literally named `signature.png` accepted
    /// instead. The ID card is matched by field name alone and is checked
    /// before the signature.
    pub fn resolve(self, require_id_card: bool) -> Result<ResolvedSubmission, AttachmentRole> {
        let Submission { fields, files, .. } = self;

        let signature_index = files
            .iter()
            .position(|file| file.field_name == AttachmentRole::SIGNATURE_FIELD)
            .or_else(|| {
                files
                    .iter()
                    .position(|file| file.filename == AttachmentRole::SIGNATURE_FILENAME)
            });
        let id_card_index = files
            .iter()
            .enumerate()
            .find(|(index, file)| {
                Some(*index) != signature_index && file.field_name == AttachmentRole::ID_CARD_FIELD
            })
            .map(|(index, _)| index);

        if require_id_card && id_card_index.is_none() {
            return Err(AttachmentRole::IdCard);
        }
        let signature_index = signature_index.ok_or(AttachmentRole::Signature)?;

        let mut signature = None;
        let mut id_card = None;
        let mut uploads = Vec::with_capacity(files.len());
        for (index, file) in files.into_iter().enumerate() {
            if index == signature_index {
                signature = Some(file);
            } else if Some(index) == id_card_index {
                uploads.push((AttachmentRole::IdCard, file.clone()));
                id_card = Some(file);
            } else {
                uploads.push((AttachmentRole::Other, file));
            }
        }

        Ok(ResolvedSubmission {
            fields,
            signature: signature.ok_or(AttachmentRole::Signature)?,
            id_card,
            uploads,
        })
    }
}

/// A submission whose required attachments were located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSubmission {
    pub fields: RegistrationFields,
    pub signature: UploadedFile,
    pub id_card: Option<UploadedFile>,
    /// Every non-signature upload in encounter order, ID card included.
    pub uploads: Vec<(AttachmentRole, UploadedFile)>,
}

impl ResolvedSubmission {
    /// Filenames of the non-signature uploads joined with `", "`.
    pub fn attached_filenames(&self) -> String {
        self.uploads
            .iter()
            .map(|(_, file)| file.filename.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Uploads that are neither the signature nor the ID card.
    pub fn other_uploads(&self) -> impl Iterator<Item = &UploadedFile> {
        self.uploads
            .iter()
            .filter(|(role, _)| *role == AttachmentRole::Other)
            .map(|(_, file)| file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(field_name: &str, filename: &str) -> UploadedFile {
        UploadedFile {
            field_name: field_name.to_string(),
            filename: filename.to_string(),
            content_type: "image/png".to_string(),
            content: Bytes::from_static(b"\x89PNG"),
        }
    }

    fn submission(files: Vec<UploadedFile>) -> Submission {
        Submission {
            files,
            ..Submission::default()
        }
    }

    #[test]
    fn repeated_field_keeps_last_value() {
        let mut fields = RegistrationFields::default();
        assert!(fields.assign("city", "חיפה".to_string()));
        assert!(fields.assign("city", "טבריה".to_string()));
        assert!(!fields.assign("favouriteColour", "blue".to_string()));
        assert_eq!(fields.city.as_deref(), Some("טבריה"));
    }

    #[test]
    fn birth_date_renders_missing_parts_as_empty() {
        let mut fields = RegistrationFields::default();
        fields.assign("birthMonth", "4".to_string());
        assert_eq!(fields.birth_date(), "/4/");
    }

    #[test]
    fn empty_agreement_value_is_not_agreement() {
        let mut fields = RegistrationFields::default();
        assert!(!fields.agreed());
        fields.assign("agreement", String::new());
        assert!(!fields.agreed());
        fields.assign("agreement", "on".to_string());
        assert!(fields.agreed());
    }

    #[test]
    fn id_card_is_checked_before_signature() {
        let err = submission(vec![]).resolve(true).expect_err("nothing uploaded");
        assert_eq!(err, AttachmentRole::IdCard);

        let err = submission(vec![upload("idCard", "id.jpg")])
            .resolve(true)
            .expect_err("signature missing");
        assert_eq!(err, AttachmentRole::Signature);
    }

    #[test]
    fn id_card_is_optional_when_not_required() {
        let resolved = submission(vec![upload("signature", "signature.png")])
            .resolve(false)
            .expect("signature alone suffices");
        assert!(resolved.id_card.is_none());
        assert_eq!(resolved.attached_filenames(), "");
    }

    #[test]
    fn signature_field_name_wins_over_filename() {
        let resolved = submission(vec![
            upload("documents", "signature.png"),
            upload("idCard", "id.jpg"),
            upload("signature", "drawn.png"),
        ])
        .resolve(true)
        .expect("resolves");

        assert_eq!(resolved.signature.filename, "drawn.png");
        assert_eq!(resolved.attached_filenames(), "signature.png, id.jpg");
        assert_eq!(resolved.other_uploads().count(), 1);
    }

    #[test]
    fn signature_falls_back_to_filename() {
        let resolved = submission(vec![
            upload("idCard", "id.jpg"),
            upload("blob", "signature.png"),
        ])
        .resolve(true)
        .expect("resolves by filename");

        assert_eq!(resolved.signature.field_name, "blob");
        assert_eq!(resolved.attached_filenames(), "id.jpg");
    }
}
