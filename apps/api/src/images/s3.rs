use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::images::{object_name, ImageStore};

const KEY_PREFIX: &str = "outfits/";

/// Stores photos in an S3-compatible bucket, referenced as `s3://<bucket>/<key>`.
#[derive(Clone)]
pub struct S3ImageStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ImageStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    fn key_of<'a>(&self, image_ref: &'a str) -> Option<&'a str> {
        image_ref
            .strip_prefix("s3://")?
            .strip_prefix(self.bucket.as_str())?
            .strip_prefix('/')
            .filter(|key| key.starts_with(KEY_PREFIX))
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn put(
        &self,
        user_id: Uuid,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, AppError> {
        let key = format!("{KEY_PREFIX}{}", object_name(user_id, content_type));
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Uploaded outfit photo to s3://{}/{}", self.bucket, key);
        Ok(format!("s3://{}/{}", self.bucket, key))
    }

    async fn remove(&self, image_ref: &str) -> Result<(), AppError> {
        let key = self
            .key_of(image_ref)
            .ok_or_else(|| AppError::Storage(format!("Not an S3 image reference: {image_ref}")))?;

        // S3 reports success for keys that no longer exist.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 delete failed: {e}")))?;
        Ok(())
    }
}
