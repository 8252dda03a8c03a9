use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::images::{object_name, ImageStore};

/// Public URL prefix under which `LocalImageStore` files are served.
pub const PUBLIC_PREFIX: &str = "/uploads/";

/// Stores photos as files in one directory, referenced as `/uploads/<name>`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Maps a reference back to a path inside `dir`, rejecting anything that
    /// could escape it.
    fn resolve(&self, image_ref: &str) -> Option<PathBuf> {
        let name = image_ref.strip_prefix(PUBLIC_PREFIX)?;
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return None;
        }
        Some(self.dir.join(name))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn put(
        &self,
        user_id: Uuid,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, AppError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create upload dir: {e}")))?;

        let name = object_name(user_id, content_type);
        let path = self.dir.join(&name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {e}", path.display())))?;

        debug!("Stored photo at {}", path.display());
        Ok(format!("{PUBLIC_PREFIX}{name}"))
    }

    async fn remove(&self, image_ref: &str) -> Result<(), AppError> {
        let Some(path) = self.resolve(image_ref) else {
            return Err(AppError::Storage(format!(
                "Not a local image reference: {image_ref}"
            )));
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path().join("uploads"));

        let image_ref = store
            .put(Uuid::new_v4(), Bytes::from_static(b"\xFF\xD8\xFF"), "image/jpeg")
            .await
            .unwrap();
        assert!(image_ref.starts_with(PUBLIC_PREFIX));

        let path = store.resolve(&image_ref).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"\xFF\xD8\xFF");

        store.remove(&image_ref).await.unwrap();
        assert!(!path.exists());
        // second removal is a no-op
        store.remove(&image_ref).await.unwrap();
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = LocalImageStore::new("/srv/uploads");
        assert!(store.resolve("/uploads/../etc/passwd").is_none());
        assert!(store.resolve("/uploads/..").is_none());
        assert!(store.resolve("/elsewhere/a.jpg").is_none());
        assert!(store.resolve("/uploads/").is_none());
        assert!(store.resolve("/uploads/a.jpg").is_some());
    }
}
