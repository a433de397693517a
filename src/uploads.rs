//! On-disk store for uploaded card images and webcam captures.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Serialize, Serializer};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// Opaque reference to a stored image.
///
/// Serialized as the bare file name so storage paths never leave the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    path: PathBuf,
}

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get just the filename (last component).
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.file_name())
    }
}

/// Writes uploads into a single directory under timestamped names.
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ensure the upload directory exists.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// Store `bytes`, keeping the extension of the client-supplied file name.
    pub async fn save(
        &self,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> std::io::Result<ImageRef> {
        self.ensure_dir().await?;
        let file_name = format!(
            "{}-{}{}",
            Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8],
            extension_of(original_name)
        );
        let path = self.dir.join(file_name);
        fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Upload stored");
        Ok(ImageRef::new(path))
    }
}

/// `.ext` of a client file name, restricted to a short alphanumeric suffix.
fn extension_of(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
