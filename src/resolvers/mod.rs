mod github;
mod http;
mod storage;

pub use github::GithubResolver;
pub use http::HttpResolver;
pub use storage::StorageResolver;

use async_trait::async_trait;

use crate::content::ContentStream;
use crate::error::FetchResult;
use crate::locator::Locator;

/// Trait for backend implementations.
/// A resolver turns a validated locator into a stream of files.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Get the resolver name
    fn name(&self) -> &str;

    /// Start fetching. Errors returned here abort the whole fetch; failures
    /// of individual files are carried by the streamed items instead.
    async fn fetch(&self, locator: &Locator) -> FetchResult<ContentStream>;
}

/// Split `dest` into its first component and the (possibly empty) rest.
pub(crate) fn split_first(dest: &str) -> (&str, &str) {
    dest.split_once('/').unwrap_or((dest, ""))
}
