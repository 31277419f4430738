use std::sync::Arc;

use async_trait::async_trait;

use super::{Resolver, split_first};
use crate::archive;
use crate::content::{Content, ContentStream};
use crate::error::{FetchError, FetchResult};
use crate::locator::{Backend, Locator};
use crate::pool;
use crate::providers::{CredentialDocument, GcsStore, ProviderRegistry, create_s3_client};
use crate::s3::{ObjectInfo, ObjectStore, S3Client};

/// Bucket download for the object storage backends (`gcs`, `s3`)
pub struct StorageResolver {
    registry: ProviderRegistry,
    store: Option<Arc<dyn ObjectStore>>,
}

impl StorageResolver {
    pub fn new() -> Self {
        StorageResolver {
            registry: ProviderRegistry::new(),
            store: None,
        }
    }

    /// Use `store` instead of connecting with the locator's credentials.
    /// Credentials are still decoded and checked against the backend.
    pub fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        StorageResolver {
            registry: ProviderRegistry::new(),
            store: Some(store),
        }
    }

    async fn connect(
        &self,
        locator: &Locator,
        bucket: &str,
        credentials: &CredentialDocument,
    ) -> FetchResult<Arc<dyn ObjectStore>> {
        if let Some(store) = &self.store {
            return Ok(Arc::clone(store));
        }

        let keys = match credentials {
            CredentialDocument::ServiceAccount(key) => {
                let store = GcsStore::new(bucket, key).map_err(FetchError::Storage)?;
                return Ok(Arc::new(store));
            }
            CredentialDocument::Keys(keys) => keys,
        };

        let backend = locator.backend().name();
        let provider = self.registry.get(backend).ok_or_else(|| {
            FetchError::InvalidDestination(format!("{backend} is not an object storage backend"))
        })?;
        let config = provider
            .build_config(keys)
            .await
            .map_err(FetchError::Storage)?;
        let client = create_s3_client(config)
            .await
            .map_err(FetchError::Storage)?;

        Ok(Arc::new(S3Client::from_client(client)))
    }
}

impl Default for StorageResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for StorageResolver {
    fn name(&self) -> &str {
        "storage"
    }

    async fn fetch(&self, locator: &Locator) -> FetchResult<ContentStream> {
        let credentials = CredentialDocument::decode(locator.auth_data())?;
        // Service account keys only speak the GCS JSON API.
        if matches!(credentials, CredentialDocument::ServiceAccount(_))
            && locator.backend() != Backend::Gcs
        {
            return Err(FetchError::CredentialsMismatch {
                kind: credentials.kind(),
                backend: locator.backend().name(),
            });
        }

        let (bucket, prefix) = split_first(locator.destination());
        if bucket.is_empty() {
            return Err(FetchError::InvalidDestination(
                "object storage destination should be \"bucket\" or \"bucket/prefix\"".to_string(),
            ));
        }

        let store = self.connect(locator, bucket, &credentials).await?;
        let mut objects = store
            .list_objects(bucket, prefix)
            .await
            .map_err(FetchError::Storage)?;
        objects.retain(|o| !o.is_folder_marker());

        let workers = locator.max_concurrency();
        tracing::info!(
            backend = %locator.backend(),
            bucket,
            prefix,
            objects = objects.len(),
            workers,
            "listed objects"
        );

        let download = Downloader {
            store,
            root: format!("{}://{}", locator.backend().name(), bucket),
            bucket: bucket.to_string(),
        };

        // A lone object may be an archive worth expanding.
        if objects.len() == 1 {
            let (tx, stream) = ContentStream::channel(workers);
            let object = objects.remove(0);
            tokio::spawn(async move {
                let content = download.get(&object).await;
                if content.is_ok() {
                    tx.forward(archive::multiplex(content, workers)).await;
                } else {
                    tx.send(content).await;
                }
            });
            return Ok(stream);
        }

        let download = Arc::new(download);
        Ok(pool::fan_out(objects, workers, move |object: &ObjectInfo| {
            let download = Arc::clone(&download);
            let object = object.clone();
            async move { download.get(&object).await }
        }))
    }
}

struct Downloader {
    store: Arc<dyn ObjectStore>,
    root: String,
    bucket: String,
}

impl Downloader {
    async fn get(&self, object: &ObjectInfo) -> Content {
        let path = format!("{}/{}", self.root, object.key);
        tracing::debug!(%path, size = object.size, "downloading object");
        match self.store.get_object(&self.bucket, &object.key).await {
            Ok(data) => Content::new(path, data),
            Err(e) => Content::failed(path, FetchError::Storage(e)),
        }
    }
}
