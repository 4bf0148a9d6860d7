//! Storage for car photos and payment proofs.
//!
//! Handlers only see [`ImageStore`]; production writes to a local directory
//! that the router serves under the public path (`/uploads` by default).

use async_trait::async_trait;
use rentcar_web::AppError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Content types accepted for uploads.
pub const ACCEPTED_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Image storage failures.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The upload is not a JPEG, PNG or WebP image.
    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),

    /// The upload has no content.
    #[error("Image is empty")]
    Empty,

    /// The file system failed.
    #[error("Image storage failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::UnsupportedType(_) | ImageError::Empty => {
                Self::bad_request(format!("{err}. Accepted types: {}", ACCEPTED_TYPES.join(", ")))
            },
            ImageError::Io(_) => Self::internal("An internal error occurred").with_source(err),
        }
    }
}

/// Where uploaded images live.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist an upload and return its public URL.
    async fn store(&self, file_name: Option<&str>, content_type: &str, bytes: &[u8]) -> Result<String, ImageError>;

    /// Delete a previously stored image. Unknown or missing images are not an error.
    async fn remove(&self, url: &str) -> Result<(), ImageError>;
}

/// Images on the local file system.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
    public_path: String,
}

impl LocalImageStore {
    /// Store images in `dir`, addressed as `<public_path>/<name>`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, public_path: &str) -> Self {
        Self {
            dir: dir.into(),
            public_path: public_path.trim_end_matches('/').to_string(),
        }
    }

    /// Directory images are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(&self.public_path)?.strip_prefix('/')?;
        let valid = !name.is_empty() && !name.contains(['/', '\\']) && !name.starts_with('.');
        valid.then(|| self.dir.join(name))
    }
}

/// File extension for an accepted content type, keeping the uploaded
/// file's own extension when it is a spelling of the same type.
fn extension(file_name: Option<&str>, content_type: &str) -> Option<&'static str> {
    let (canonical, aliases): (&'static str, &[&'static str]) = match content_type {
        "image/jpeg" => ("jpg", &["jpg", "jpeg"]),
        "image/png" => ("png", &["png"]),
        "image/webp" => ("webp", &["webp"]),
        _ => return None,
    };
    let uploaded = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    Some(
        aliases
            .iter()
            .copied()
            .find(|alias| uploaded.as_deref() == Some(*alias))
            .unwrap_or(canonical),
    )
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, file_name: Option<&str>, content_type: &str, bytes: &[u8]) -> Result<String, ImageError> {
        let ext = extension(file_name, content_type)
            .ok_or_else(|| ImageError::UnsupportedType(content_type.to_string()))?;
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let name = format!("{}.{ext}", Uuid::new_v4().simple());
        tokio::fs::write(self.dir.join(&name), bytes).await?;

        tracing::debug!(file = %name, size = bytes.len(), "Stored image");
        Ok(format!("{}/{name}", self.public_path))
    }

    async fn remove(&self, url: &str) -> Result<(), ImageError> {
        let Some(path) = self.file_for(url) else {
            tracing::debug!(url, "Not a local image, nothing to remove");
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(url, "Removed image");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(url, "Image already missing");
                Ok(())
            },
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(extension(Some("car.JPEG"), "image/jpeg"), Some("jpeg"));
        assert_eq!(extension(Some("car.png"), "image/jpeg"), Some("jpg"));
        assert_eq!(extension(None, "image/webp"), Some("webp"));
        assert_eq!(extension(Some("car.gif"), "image/gif"), None);
    }

    #[tokio::test]
    async fn store_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "/uploads/");

        let url = store.store(Some("avanza.png"), "image/png", b"\x89PNG").await.unwrap();
        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".png"));

        let path = store.file_for(&url).unwrap();
        assert!(path.exists());

        store.remove(&url).await.unwrap();
        assert!(!path.exists());

        // Second removal only logs.
        store.remove(&url).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_other_types_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "/uploads");

        assert!(matches!(
            store.store(Some("doc.pdf"), "application/pdf", b"%PDF").await,
            Err(ImageError::UnsupportedType(_))
        ));
        assert!(matches!(
            store.store(Some("a.jpg"), "image/jpeg", b"").await,
            Err(ImageError::Empty)
        ));
    }

    #[test]
    fn foreign_urls_are_ignored() {
        let store = LocalImageStore::new("/tmp/x", "/uploads");
        assert!(store.file_for("https://cdn.example.com/a.png").is_none());
        assert!(store.file_for("/uploads/../etc/passwd").is_none());
        assert!(store.file_for("/uploads/").is_none());
    }
}
