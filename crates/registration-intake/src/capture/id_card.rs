use std::io;
use std::path::Path;

use base64::Engine;
use bytes::Bytes;

/// Uploads larger than this are refused before submission.
pub const MAX_ID_CARD_BYTES: u64 = 5 * 1024 * 1024;

/// A file chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub filename: String,
    pub content_type: String,
    pub content: Bytes,
}

impl SelectedFile {
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// `data:` URL suitable for an image preview.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            base64::engine::general_purpose::STANDARD.encode(&self.content)
        )
    }
}

/// ID-card file input together with its preview.
#[derive(Debug, Clone, Default)]
pub struct IdCardPreview {
    file: Option<SelectedFile>,
    preview_src: Option<String>,
}

impl IdCardPreview {
    /// Reads the file from disk and shows it in the preview.
    pub async fn select(&mut self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        self.select_file(SelectedFile {
            filename,
            content_type,
            content: Bytes::from(content),
        });
        Ok(())
    }

    pub fn select_file(&mut self, file: SelectedFile) {
        self.preview_src = Some(file.data_url());
        self.file = Some(file);
    }

    /// Clears the selection and hides the preview.
    pub fn remove(&mut self) {
        self.file = None;
        self.preview_src = None;
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn preview_src(&self) -> Option<&str> {
        self.preview_src.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.preview_src.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn select_reads_file_and_shows_preview() {
        let mut file = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .expect("temp file");
        file.write_all(b"fake png").expect("write temp file");

        let mut preview = IdCardPreview::default();
        preview.select(file.path()).await.expect("file selected");

        let selected = preview.file().expect("file kept");
        assert_eq!(selected.content_type, "image/png");
        assert_eq!(selected.size(), 8);
        assert!(preview.is_visible());
        assert_eq!(
            preview.preview_src(),
            Some("data:image/png;base64,ZmFrZSBwbmc=")
        );
    }

    #[test]
    fn remove_hides_preview() {
        let mut preview = IdCardPreview::default();
        preview.select_file(SelectedFile {
            filename: "id.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            content: Bytes::from_static(b"jpeg"),
        });
        preview.remove();
        assert!(preview.file().is_none());
        assert!(!preview.is_visible());
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let mut preview = IdCardPreview::default();
        let err = preview
            .select("/definitely/not/here.png")
            .await
            .expect_err("file does not exist");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!preview.is_visible());
    }
}
