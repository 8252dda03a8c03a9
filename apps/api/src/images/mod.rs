//! Photo storage. The core never interprets an image reference; it only hands
//! it back to the store that minted it for removal.

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::errors::AppError;

pub mod local;
pub mod s3;

pub use local::LocalImageStore;
pub use s3::S3ImageStore;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores one photo and returns its opaque reference.
    async fn put(&self, user_id: Uuid, bytes: Bytes, content_type: &str)
        -> Result<String, AppError>;

    /// Releases a photo. Removing one that is already gone succeeds.
    async fn remove(&self, image_ref: &str) -> Result<(), AppError>;
}

/// Canonical media type for a photo the analyzer can read, or `None`.
pub fn supported_media_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("image/jpeg"),
        "image/png" => Some("image/png"),
        "image/gif" => Some("image/gif"),
        "image/webp" => Some("image/webp"),
        _ => None,
    }
}

/// File extension for an image MIME type.
pub fn extension_for(content_type: &str) -> &'static str {
    match supported_media_type(content_type) {
        Some("image/jpeg") => "jpg",
        Some("image/png") => "png",
        Some("image/gif") => "gif",
        Some("image/webp") => "webp",
        _ => "img",
    }
}

fn object_name(user_id: Uuid, content_type: &str) -> String {
    format!(
        "{user_id}-{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension_for(content_type)
    )
}
