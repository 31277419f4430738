use thiserror::Error;

/// Errors raised while parsing a locator, before any network access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArlError {
    #[error("invalid ARL format")]
    InvalidFormat,

    #[error("method not implemented")]
    MethodNotImplemented,

    #[error("auth not implemented")]
    AuthNotImplemented,

    #[error("max concurrency must be at least 1")]
    InvalidConcurrency,
}

/// Errors raised while fetching.
///
/// Returned from [`crate::Arl::fetch`] when the whole operation fails, or
/// attached to a single [`crate::Content`] when only that file failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("invalid basic authentication data")]
    InvalidBasicAuth,

    #[error("invalid credentials encoding: {0}")]
    InvalidCredentials(#[from] base64::DecodeError),

    #[error("invalid credentials document: {0}")]
    InvalidCredentialsJson(#[source] serde_json::Error),

    #[error("{kind} credentials cannot be used with the {backend} backend")]
    CredentialsMismatch {
        kind: &'static str,
        backend: &'static str,
    },

    #[error("failed to get resource {url}: {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("failed parsing {url}: {source}")]
    InvalidListing {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("listing entry missing {0}")]
    MissingField(&'static str),

    #[error("maximum resource size reached: {path} is {size} bytes (limit {max})")]
    MaxSizeExceeded { path: String, size: u64, max: u64 },

    #[error("object storage error: {0:#}")]
    Storage(anyhow::Error),

    #[error("archive read failed: {0}")]
    Archive(#[from] std::io::Error),

    #[error("zip entry failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
