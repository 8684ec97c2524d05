use chrono::{DateTime, TimeZone};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use super::submission::{text, ResolvedSubmission};

pub const WORKBOOK_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const SHEET_NAME: &str = "Registrations";
pub const PROGRAMME: &str = "תואר B.A רב תחומי וחינוך - מכללת כנרת";

/// Israeli locale rendering used for the registration timestamp.
pub fn format_local_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format("%-d.%-m.%Y, %-H:%M:%S").to_string()
}

/// The single spreadsheet row produced for a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRecord {
    columns: Vec<(&'static str, String)>,
}

impl RegistrationRecord {
    pub fn from_submission<Tz>(submission: &ResolvedSubmission, registered_at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let fields = &submission.fields;
        let columns = vec![
            ("תאריך הרשמה", format_local_timestamp(registered_at)),
            ("שם פרטי", text(&fields.first_name).to_string()),
            ("שם משפחה", text(&fields.last_name).to_string()),
            ("תעודת זהות", text(&fields.id_number).to_string()),
            ("טלפון נייד", text(&fields.phone).to_string()),
            ("תאריך לידה", fields.birth_date()),
            ("יישוב", text(&fields.city).to_string()),
            ("כתובת", text(&fields.address).to_string()),
            ("מין", text(&fields.gender).to_string()),
            ("דואר אלקטרוני", text(&fields.email).to_string()),
            ("הסכמה לפרסום בפייסבוק", text(&fields.facebook_consent).to_string()),
            ("שם היועץ", text(&fields.advisor_name).to_string()),
            ("מסלול", PROGRAMME.to_string()),
            ("קבצים מצורפים", submission.attached_filenames()),
        ];
        Self { columns }
    }

    pub fn columns(&self) -> &[(&'static str, String)] {
        &self.columns
    }

    pub fn value(&self, header: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(label, _)| *label == header)
            .map(|(_, value)| value.as_str())
    }

    /// Serializes the header row and the data row into an `.xlsx` buffer.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;
        worksheet.set_right_to_left(true);

        for (col, (label, value)) in (0u16..).zip(self.columns.iter()) {
            worksheet.write_string_with_format(0, col, *label, &header_format)?;
            worksheet.write_string(1, col, value)?;
        }

        workbook.save_to_buffer()
    }
}

/// `registration_kinneret_<date>_<epoch millis>.xlsx`
pub fn workbook_filename<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "registration_kinneret_{}_{}.xlsx",
        at.naive_utc().date().format("%Y-%m-%d"),
        at.timestamp_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::submission::{AttachmentRole, RegistrationFields, UploadedFile};
    use bytes::Bytes;
    use chrono::{FixedOffset, Utc};

    fn file(field_name: &str, filename: &str) -> UploadedFile {
        UploadedFile {
            field_name: field_name.to_string(),
            filename: filename.to_string(),
            content_type: "image/jpeg".to_string(),
            content: Bytes::from_static(b"data"),
        }
    }

    fn resolved() -> ResolvedSubmission {
        let mut fields = RegistrationFields::default();
        fields.assign("firstName", "דנה".to_string());
        fields.assign("birthDay", "7".to_string());
        fields.assign("birthMonth", "3".to_string());
        fields.assign("birthYear", "2001".to_string());
        ResolvedSubmission {
            fields,
            signature: file("signature", "signature.png"),
            id_card: Some(file("idCard", "id.jpg")),
            uploads: vec![
                (AttachmentRole::IdCard, file("idCard", "id.jpg")),
                (AttachmentRole::Other, file("documents", "diploma.pdf")),
            ],
        }
    }

    #[test]
    fn record_defaults_absent_fields_to_empty() {
        let at = FixedOffset::east_opt(3 * 3600)
            .expect("valid offset")
            .with_ymd_and_hms(2026, 10, 18, 9, 5, 7)
            .single()
            .expect("valid timestamp");
        let record = RegistrationRecord::from_submission(&resolved(), &at);

        assert_eq!(record.value("תאריך הרשמה"), Some("18.10.2026, 9:05:07"));
        assert_eq!(record.value("שם פרטי"), Some("דנה"));
        assert_eq!(record.value("שם משפחה"), Some(""));
        assert_eq!(record.value("תאריך לידה"), Some("7/3/2001"));
        assert_eq!(record.value("מסלול"), Some(PROGRAMME));
        assert_eq!(record.value("קבצים מצורפים"), Some("id.jpg, diploma.pdf"));
        assert_eq!(record.columns().len(), 14);
    }

    #[test]
    fn xlsx_buffer_is_a_zip_container() {
        let record = RegistrationRecord::from_submission(&resolved(), &Utc::now());
        let buffer = record.to_xlsx().expect("workbook serializes");
        assert!(buffer.starts_with(b"PK"));
    }

    #[test]
    fn filename_carries_date_and_millis() {
        let at = Utc
            .with_ymd_and_hms(2026, 10, 18, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        assert_eq!(
            workbook_filename(&at),
            format!("registration_kinneret_2026-10-18_{}.xlsx", at.timestamp_millis())
        );
    }
}
