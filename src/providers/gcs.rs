use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::ObjectStore as _;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use object_store::path::Path;

use super::{Provider, ProviderConfig, StorageCredentials};
use crate::s3::{ObjectInfo, ObjectStore};

/// Google's S3-compatible XML API endpoint
const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// Google Cloud Storage provider, reached with HMAC keys through the
/// interoperability endpoint
pub struct GcsProvider;

impl Default for GcsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GcsProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Provider for GcsProvider {
    fn name(&self) -> &str {
        "gcs"
    }

    async fn build_config(&self, credentials: &StorageCredentials) -> Result<ProviderConfig> {
        Ok(ProviderConfig {
            endpoint_url: Some(
                credentials
                    .endpoint_url
                    .clone()
                    .unwrap_or_else(|| GCS_ENDPOINT.to_string()),
            ),
            force_path_style: true,
            region: credentials
                .region
                .clone()
                .unwrap_or_else(|| "auto".to_string()),
            credentials: credentials.to_sdk_credentials("gcs"),
        })
    }
}

/// Native JSON API access with a service account key, bound to one bucket
pub struct GcsStore {
    bucket: String,
    store: GoogleCloudStorage,
}

impl GcsStore {
    pub fn new(bucket: &str, service_account_key: &str) -> Result<Self> {
        let store = GoogleCloudStorageBuilder::new()
            .with_bucket_name(bucket)
            .with_service_account_key(service_account_key)
            .build()
            .context("Failed to configure Google Cloud Storage client")?;
        Ok(GcsStore {
            bucket: bucket.to_string(),
            store,
        })
    }

    fn check_bucket(&self, bucket: &str) -> Result<()> {
        anyhow::ensure!(
            bucket == self.bucket,
            "client is bound to bucket {}, not {bucket}",
            self.bucket
        );
        Ok(())
    }
}

/// Deepest whole directory of a key prefix. Listing there and filtering by
/// the raw prefix gives plain string-prefix semantics.
fn list_root(prefix: &str) -> Option<Path> {
    prefix
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .filter(|dir| !dir.is_empty())
        .map(Path::from)
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>> {
        self.check_bucket(bucket)?;
        let root = list_root(prefix);
        let listed: Vec<_> = self
            .store
            .list(root.as_ref())
            .try_collect()
            .await
            .context(format!("Failed to list objects in bucket: {}", bucket))?;

        Ok(listed
            .into_iter()
            .map(|meta| ObjectInfo {
                key: meta.location.to_string(),
                size: meta.size as u64,
            })
            .filter(|object| object.key.starts_with(prefix))
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.check_bucket(bucket)?;
        let location = Path::from(key);
        let resp = self
            .store
            .get(&location)
            .await
            .context(format!("Failed to get object {}/{}", bucket, key))?;
        resp.bytes().await.context("Failed to read object body")
    }
}
