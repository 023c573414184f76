//! Local-disk sink for appointment photos.
//!
//! The database only ever sees the returned file name; bytes stay on disk.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::ApiError;

pub const MAX_IMAGES: usize = 5;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// An image part accepted from a multipart request, not yet written.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl PendingImage {
    /// Check name, content type and size the way the upload form promises.
    pub fn accept(
        file_name: Option<&str>,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, ApiError> {
        let extension = file_name
            .and_then(allowed_extension)
            .ok_or_else(|| ApiError::validation("Only jpg, jpeg, png or gif images can be uploaded"))?;

        if !content_type.is_some_and(is_allowed_content_type) {
            return Err(ApiError::validation(
                "Only jpg, jpeg, png or gif images can be uploaded",
            ));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::validation("Each image must be at most 5MB"));
        }
        Ok(Self { extension, bytes })
    }
}

/// Lowercased extension of `file_name` when it is an accepted image type.
pub fn allowed_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

pub fn is_allowed_content_type(content_type: &str) -> bool {
    matches!(
        content_type.to_ascii_lowercase().as_str(),
        "image/jpeg" | "image/jpg" | "image/png" | "image/gif"
    )
}

#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Write every image under a fresh unique name; returns the names in order.
    /// On a write failure the files already written are removed again.
    pub async fn save_all(&self, images: Vec<PendingImage>) -> Result<Vec<String>, ApiError> {
        let mut saved = Vec::with_capacity(images.len());
        for image in images {
            let name = format!("{}.{}", Uuid::new_v4(), image.extension);
            if let Err(e) = tokio::fs::write(self.root.join(&name), &image.bytes).await {
                tracing::error!(error = %e, file = %name, "failed to write upload");
                self.discard(&saved).await;
                return Err(ApiError::storage_failure());
            }
            saved.push(name);
        }
        Ok(saved)
    }

    /// Best-effort removal of previously saved files.
    pub async fn discard(&self, names: &[String]) {
        for name in names {
            if let Err(e) = tokio::fs::remove_file(self.root.join(name)).await {
                tracing::warn!(error = %e, file = %name, "failed to remove orphaned upload");
            }
        }
    }
}
