use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use super::Resolver;
use crate::archive;
use crate::config::FetchConfig;
use crate::content::{Content, ContentStream};
use crate::error::{FetchError, FetchResult};
use crate::locator::{AuthKind, Backend, Locator};

const HEADER_OTX_API_KEY: &str = "X-OTX-API-KEY";

/// Plain HTTP(S) download of a single resource
pub struct HttpResolver {
    config: FetchConfig,
}

impl HttpResolver {
    pub fn new(config: FetchConfig) -> Self {
        HttpResolver { config }
    }

    /// Full request URL for `locator`. Destinations that already carry a
    /// scheme (the `https://` shortcut form) are used verbatim.
    pub fn url(locator: &Locator) -> FetchResult<String> {
        let dest = locator.destination();
        if dest.starts_with("http://") || dest.starts_with("https://") {
            return Ok(dest.to_string());
        }
        match locator.backend() {
            Backend::Http => Ok(format!("http://{dest}")),
            Backend::Https => Ok(format!("https://{dest}")),
            other => Err(FetchError::InvalidDestination(format!(
                "{other} is not an http backend"
            ))),
        }
    }

    fn request(&self, url: &str, locator: &Locator) -> FetchResult<reqwest::RequestBuilder> {
        let req = self
            .config
            .http_client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.config.user_agent);

        let data = locator.auth_data();
        let req = match locator.auth_kind() {
            AuthKind::Basic => {
                let (user, pass) = parse_basic(data)?;
                req.basic_auth(user, Some(pass))
            }
            AuthKind::Bearer => req.header(AUTHORIZATION, format!("bearer {data}")),
            AuthKind::Token => req.header(AUTHORIZATION, format!("token {data}")),
            AuthKind::Otx => req.header(HEADER_OTX_API_KEY, data),
            _ => req,
        };
        Ok(req)
    }
}

#[async_trait]
impl Resolver for HttpResolver {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, locator: &Locator) -> FetchResult<ContentStream> {
        let url = Self::url(locator)?;
        let req = self.request(&url, locator)?;

        tracing::debug!(%url, auth = locator.auth_kind().name(), "fetching");
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url,
                status: resp.status(),
            });
        }

        let body = resp.bytes().await?;
        tracing::info!(%url, bytes = body.len(), "downloaded");

        Ok(archive::multiplex(
            Content::new(url, body),
            locator.max_concurrency(),
        ))
    }
}

/// Split `user:pass`. Exactly one colon is accepted.
fn parse_basic(data: &str) -> FetchResult<(&str, &str)> {
    let mut parts = data.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(user), Some(pass), None) => Ok((user, pass)),
        _ => Err(FetchError::InvalidBasicAuth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_prefixes_scheme() {
        let loc = Locator::parse("[http,example.com/a]", 0, 1).unwrap();
        assert_eq!(HttpResolver::url(&loc).unwrap(), "http://example.com/a");

        let loc = Locator::parse("[https,example.com/a]", 0, 1).unwrap();
        assert_eq!(HttpResolver::url(&loc).unwrap(), "https://example.com/a");
    }

    #[test]
    fn test_url_shortcut_not_doubled() {
        let loc = Locator::parse("https://example.com/a", 0, 1).unwrap();
        assert_eq!(HttpResolver::url(&loc).unwrap(), "https://example.com/a");
    }

    #[test]
    fn test_parse_basic() {
        assert_eq!(parse_basic("user:pass").unwrap(), ("user", "pass"));
        assert_eq!(parse_basic("user:").unwrap(), ("user", ""));
        assert!(matches!(parse_basic("userpass"), Err(FetchError::InvalidBasicAuth)));
        assert!(matches!(parse_basic("a:b:c"), Err(FetchError::InvalidBasicAuth)));
    }
}
