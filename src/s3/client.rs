use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use bytes::Bytes;

/// Object storage operations the storage resolver depends on
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object under `prefix`, following pagination to the end
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>>;

    /// Get an entire object's contents
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;
}

/// Wrapper around AWS S3 client
pub struct S3Client {
    client: Client,
}

impl S3Client {
    /// Wrap an already configured SDK client
    pub fn from_client(client: Client) -> Self {
        S3Client { client }
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation.take());

            if !prefix.is_empty() {
                req = req.prefix(prefix);
            }

            let resp = req
                .send()
                .await
                .context(format!("Failed to list objects in bucket: {}", bucket))?;

            objects.extend(resp.contents().iter().map(|obj| ObjectInfo {
                key: obj.key().unwrap_or("").to_string(),
                size: obj.size().unwrap_or(0) as u64,
            }));

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(objects)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .context(format!("Failed to get object {}/{}", bucket, key))?;

        let bytes = resp
            .body
            .collect()
            .await
            .context("Failed to read object body")?
            .into_bytes();

        Ok(bytes)
    }
}

/// Information about a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

impl ObjectInfo {
    /// Zero-byte keys ending in `/` are folder markers, not files
    pub fn is_folder_marker(&self) -> bool {
        self.size == 0 && self.key.ends_with('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_marker() {
        let marker = ObjectInfo {
            key: "logs/".to_string(),
            size: 0,
        };
        assert!(marker.is_folder_marker());

        let file = ObjectInfo {
            key: "logs/app.log".to_string(),
            size: 0,
        };
        assert!(!file.is_folder_marker());
    }
}
