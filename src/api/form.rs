//! Multipart form collection.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use tracing::debug;

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub bytes: Bytes,
}

/// A fully read multipart body.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, FilePart>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Drain `multipart`. Parts with a file name are files, the rest text.
    /// Empty files are dropped.
    pub async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    if bytes.is_empty() {
                        debug!(field = %name, "Skipping empty upload");
                        continue;
                    }
                    form.files.insert(
                        name,
                        FilePart {
                            file_name,
                            bytes,
                        },
                    );
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.get(name)
    }

    /// Non-blank text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}
