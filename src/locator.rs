//! Parsing and validation of authenticated resource locators.
//!
//! Two shapes are accepted:
//!
//! ```text
//! https://<host>/<path>
//! [<backend>,<destination>]
//! [<backend>,<destination>,<auth kind>,<auth data>]
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ArlError;

/// Default ceiling used by [`FromStr`]: unlimited.
pub const DEFAULT_MAX_SIZE: u64 = 0;

/// Default worker count used by [`FromStr`].
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Where a locator's content lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Http,
    Https,
    Gcs,
    S3,
    Github,
}

impl Backend {
    /// Auth kinds this backend accepts. `AuthKind::None` must be listed
    /// explicitly for a backend to accept unauthenticated locators.
    pub const fn supported_auth(self) -> &'static [AuthKind] {
        match self {
            Backend::Http | Backend::Https => &[
                AuthKind::None,
                AuthKind::Basic,
                AuthKind::Bearer,
                AuthKind::Token,
                AuthKind::Otx,
            ],
            Backend::Gcs => &[AuthKind::Gaia],
            Backend::S3 => &[AuthKind::Aws],
            Backend::Github => &[AuthKind::None, AuthKind::Token],
        }
    }

    pub fn supports(self, auth: AuthKind) -> bool {
        self.supported_auth().contains(&auth)
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Http => "http",
            Backend::Https => "https",
            Backend::Gcs => "gcs",
            Backend::S3 => "s3",
            Backend::Github => "github",
        }
    }
}

impl FromStr for Backend {
    type Err = ArlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Backend::Http),
            "https" => Ok(Backend::Https),
            "gcs" => Ok(Backend::Gcs),
            "s3" => Ok(Backend::S3),
            "github" => Ok(Backend::Github),
            _ => Err(ArlError::MethodNotImplemented),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the locator authenticates against its backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthKind {
    /// No authentication (empty auth field)
    None,
    /// `user:pass` HTTP basic auth
    Basic,
    /// `Authorization: bearer <data>`
    Bearer,
    /// `Authorization: token <data>`
    Token,
    /// `X-OTX-API-KEY: <data>`
    Otx,
    /// Base64 JSON credential blob for Google Cloud Storage
    Gaia,
    /// Base64 JSON credential blob for Amazon S3
    Aws,
}

impl AuthKind {
    pub fn name(self) -> &'static str {
        match self {
            AuthKind::None => "",
            AuthKind::Basic => "basic",
            AuthKind::Bearer => "bearer",
            AuthKind::Token => "token",
            AuthKind::Otx => "otx",
            AuthKind::Gaia => "gaia",
            AuthKind::Aws => "aws",
        }
    }
}

impl FromStr for AuthKind {
    type Err = ArlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(AuthKind::None),
            "basic" => Ok(AuthKind::Basic),
            "bearer" => Ok(AuthKind::Bearer),
            "token" => Ok(AuthKind::Token),
            "otx" => Ok(AuthKind::Otx),
            "gaia" => Ok(AuthKind::Gaia),
            "aws" => Ok(AuthKind::Aws),
            _ => Err(ArlError::AuthNotImplemented),
        }
    }
}

/// A parsed and validated locator.
#[derive(Clone, PartialEq, Eq)]
pub struct Locator {
    backend: Backend,
    destination: String,
    auth_kind: AuthKind,
    auth_data: String,
    max_size: u64,
    max_concurrency: usize,
}

impl Locator {
    /// Parse `raw` and validate the backend/auth combination.
    ///
    /// `max_size` is a byte ceiling (0 disables it) and `max_concurrency`
    /// bounds the number of simultaneous downloads.
    pub fn parse(raw: &str, max_size: u64, max_concurrency: usize) -> Result<Self, ArlError> {
        if max_concurrency == 0 {
            return Err(ArlError::InvalidConcurrency);
        }

        let (backend, destination, auth_kind, auth_data) = if raw.starts_with("https://") {
            ("https".to_string(), raw.to_string(), String::new(), String::new())
        } else if let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let fields: Vec<&str> = inner.split(',').map(str::trim).collect();
            match fields.as_slice() {
                [backend, destination] => (
                    backend.to_lowercase(),
                    destination.to_string(),
                    String::new(),
                    String::new(),
                ),
                [backend, destination, kind, data] => (
                    backend.to_lowercase(),
                    destination.to_string(),
                    kind.to_lowercase(),
                    data.to_string(),
                ),
                _ => return Err(ArlError::InvalidFormat),
            }
        } else {
            return Err(ArlError::InvalidFormat);
        };

        let backend: Backend = backend.parse()?;
        let auth_kind: AuthKind = auth_kind.parse()?;
        if !backend.supports(auth_kind) {
            return Err(ArlError::AuthNotImplemented);
        }

        Ok(Locator {
            backend,
            destination,
            auth_kind,
            auth_data,
            max_size,
            max_concurrency,
        })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn auth_kind(&self) -> AuthKind {
        self.auth_kind
    }

    pub fn auth_data(&self) -> &str {
        &self.auth_data
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

impl FromStr for Locator {
    type Err = ArlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s, DEFAULT_MAX_SIZE, DEFAULT_MAX_CONCURRENCY)
    }
}

// auth_data is a secret
impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locator")
            .field("backend", &self.backend)
            .field("destination", &self.destination)
            .field("auth_kind", &self.auth_kind)
            .field("auth_data", &"<redacted>")
            .field("max_size", &self.max_size)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}
