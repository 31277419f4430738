use super::{Provider, ProviderConfig, StorageCredentials};
use anyhow::Result;

const DEFAULT_REGION: &str = "us-east-1";

/// AWS S3 provider
pub struct AwsProvider;

impl AwsProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Provider for AwsProvider {
    fn name(&self) -> &str {
        "s3"
    }

    async fn build_config(&self, credentials: &StorageCredentials) -> Result<ProviderConfig> {
        // A custom endpoint (MinIO, LocalStack, ...) usually needs path-style addressing.
        let endpoint_url = credentials.endpoint_url.clone();
        Ok(ProviderConfig {
            force_path_style: endpoint_url.is_some(),
            endpoint_url,
            region: credentials
                .region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            credentials: credentials.to_sdk_credentials("s3"),
        })
    }
}
