use std::path::Path;

use crate::error::{ClientError, Result};

/// Multipart form fields, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormData {
    fields: Vec<(String, String)>,
    files: Vec<(String, ProfileImage)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    pub fn append(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.fields.push((name.to_owned(), value.into()));
        self
    }

    /// Append a file field.
    pub fn append_file(&mut self, name: &str, file: ProfileImage) -> &mut Self {
        self.files.push((name.to_owned(), file));
        self
    }

    /// First text value appended under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn file(&self, name: &str) -> Option<&ProfileImage> {
        self.files
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, file)| file)
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn files(&self) -> &[(String, ProfileImage)] {
        &self.files
    }

    /// Total bytes of every attached file.
    pub fn upload_size(&self) -> u64 {
        self.files.iter().map(|(_, file)| file.len() as u64).sum()
    }
}

/// In-memory image about to be uploaded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ProfileImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        Self {
            content_type: guess_content_type(&file_name).map(str::to_owned),
            file_name,
            bytes,
        }
    }

    /// Read an image from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            ClientError::storage(format!("cannot read `{}`", path.display()), err)
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(file_name, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let extension = Path::new(file_name).extension()?.to_str()?;
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_data() {
        let mut form = FormData::new();
        form.append("username", "alice01")
            .append("isActive", "true")
            .append_file("profileImage", ProfileImage::new("me.PNG", vec![0; 10]));

        assert_eq!(form.get("username"), Some("alice01"));
        assert_eq!(form.get("email"), None);
        assert_eq!(form.upload_size(), 10);
        assert_eq!(
            form.file("profileImage").and_then(|f| f.content_type.as_deref()),
            Some("image/png")
        );
    }
}
