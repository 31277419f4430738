use std::sync::Arc;

use crate::config::FetchConfig;
use crate::content::ContentStream;
use crate::error::{ArlError, FetchResult};
use crate::locator::{Backend, Locator};
use crate::resolvers::{GithubResolver, HttpResolver, Resolver, StorageResolver};

/// An authenticated resource locator bound to the resolver for its backend.
///
/// ```no_run
/// # async fn run() -> anyhow::Result<()> {
/// let arl = arl::Arl::new("[https,example.com/rules.tar.gz]", 10 * 1024 * 1024, 4)?;
/// let mut files = arl.fetch().await?;
/// while let Some(file) = files.next().await {
///     match file.error {
///         None => println!("{}: {} bytes", file.path, file.data.len()),
///         Some(e) => eprintln!("{}: {e}", file.path),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Arl {
    locator: Locator,
    resolver: Arc<dyn Resolver>,
}

impl Arl {
    /// Parse `raw` with the default [`FetchConfig`]
    pub fn new(raw: &str, max_size: u64, max_concurrency: usize) -> Result<Self, ArlError> {
        Self::with_config(raw, max_size, max_concurrency, FetchConfig::default())
    }

    pub fn with_config(
        raw: &str,
        max_size: u64,
        max_concurrency: usize,
        config: FetchConfig,
    ) -> Result<Self, ArlError> {
        let locator = Locator::parse(raw, max_size, max_concurrency)?;
        let resolver: Arc<dyn Resolver> = match locator.backend() {
            Backend::Http | Backend::Https => Arc::new(HttpResolver::new(config)),
            Backend::Gcs | Backend::S3 => Arc::new(StorageResolver::new()),
            Backend::Github => Arc::new(GithubResolver::new(config)),
        };
        Ok(Arl { locator, resolver })
    }

    /// Bind an already parsed locator to a specific resolver
    pub fn from_parts(locator: Locator, resolver: Arc<dyn Resolver>) -> Self {
        Arl { locator, resolver }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Start fetching.
    ///
    /// Errors returned here abort the whole fetch before any file is
    /// produced. Failures of single files arrive as items of the stream.
    pub async fn fetch(&self) -> FetchResult<ContentStream> {
        tracing::debug!(
            backend = %self.locator.backend(),
            resolver = self.resolver.name(),
            auth = self.locator.auth_kind().name(),
            "resolving locator"
        );
        self.resolver.fetch(&self.locator).await
    }
}

impl std::fmt::Debug for Arl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arl")
            .field("locator", &self.locator)
            .field("resolver", &self.resolver.name())
            .finish()
    }
}
