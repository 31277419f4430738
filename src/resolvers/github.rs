//! Source hosting backend.
//!
//! With a token the repository contents API is walked recursively and every
//! file is downloaded through the worker pool. Without one, the repository
//! snapshot tarball is downloaded once and walked locally.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde::Deserialize;

use super::Resolver;
use crate::archive::{self, Compression};
use crate::config::FetchConfig;
use crate::content::{Content, ContentStream};
use crate::error::{FetchError, FetchResult};
use crate::locator::{AuthKind, Locator};
use crate::pool;

const DESTINATION_HINT: &str =
    r#"github destination should be "repoOwner/repoName" or "repoOwner/repoName/repoSubDir""#;

pub struct GithubResolver {
    config: FetchConfig,
}

impl GithubResolver {
    pub fn new(config: FetchConfig) -> Self {
        GithubResolver { config }
    }

    fn session(&self, locator: &Locator) -> Session {
        Session {
            client: self.config.http_client.clone(),
            user_agent: self.config.user_agent.clone(),
            token: match locator.auth_kind() {
                AuthKind::Token => Some(locator.auth_data().to_string()),
                _ => None,
            },
        }
    }

    async fn fetch_from_api(&self, repo: RepoSpec, locator: &Locator) -> FetchResult<ContentStream> {
        let session = Arc::new(self.session(locator));
        let lister = Lister {
            session: &session,
            base_url: format!(
                "{}/repos/{}/{}/contents/",
                self.config.github_api_url, repo.owner, repo.name
            ),
            query: &repo.query,
            max_size: locator.max_size(),
        };
        let mut files = lister.list(repo.path.clone()).await?;

        let workers = locator.max_concurrency();
        tracing::info!(
            owner = %repo.owner,
            repo = %repo.name,
            files = files.len(),
            workers,
            "listed repository contents"
        );

        // A lone file may be an archive worth expanding.
        if files.len() == 1 {
            let file = files.remove(0);
            let data = session.get(&file.download_url).await?;
            return Ok(archive::multiplex(Content::new(file.path, data), workers));
        }

        Ok(pool::fan_out(files, workers, move |file: &DirectoryEntry| {
            let session = Arc::clone(&session);
            let path = file.path.clone();
            let url = file.download_url.clone();
            let size = file.size;
            async move {
                tracing::debug!(%path, size, "downloading file");
                match session.get(&url).await {
                    Ok(data) => Content::new(path, data),
                    Err(e) => Content::failed(path, e),
                }
            }
        }))
    }

    async fn fetch_snapshot(&self, repo: RepoSpec, locator: &Locator) -> FetchResult<ContentStream> {
        let session = self.session(locator);
        let url = repo.tarball_url(&self.config.github_api_url);

        tracing::debug!(%url, "downloading repository snapshot");
        let data = session.get(&url).await?;
        tracing::info!(%url, bytes = data.len(), "downloaded repository snapshot");

        let (tx, stream) = ContentStream::channel(locator.max_concurrency());
        tokio::task::spawn_blocking(move || {
            walk_snapshot(data, &repo.path, &url, |content| tx.blocking_send(content));
        });
        Ok(stream)
    }
}

#[async_trait]
impl Resolver for GithubResolver {
    fn name(&self) -> &str {
        "github"
    }

    async fn fetch(&self, locator: &Locator) -> FetchResult<ContentStream> {
        let repo = RepoSpec::parse(locator.destination())?;
        match locator.auth_kind() {
            AuthKind::None => self.fetch_snapshot(repo, locator).await,
            AuthKind::Token => self.fetch_from_api(repo, locator).await,
            _ => Err(FetchError::InvalidDestination(
                "unsupported github authentication".to_string(),
            )),
        }
    }
}

/// Repository coordinates parsed from a destination
#[derive(Debug, Clone, PartialEq, Eq)]
struct RepoSpec {
    owner: String,
    name: String,
    /// Sub-path inside the repository, without trailing `/`
    path: String,
    /// `?query` suffix re-appended to every listing URL, or empty
    query: String,
}

impl RepoSpec {
    fn parse(dest: &str) -> FetchResult<Self> {
        let (root, query) = match dest.split_once('?') {
            Some((root, params)) => (root, format!("?{params}")),
            None => (dest, String::new()),
        };

        let mut parts = root.splitn(3, '/');
        let (owner, name) = match (parts.next(), parts.next()) {
            (Some(owner), Some(name)) => (owner, name),
            _ => return Err(FetchError::InvalidDestination(DESTINATION_HINT.to_string())),
        };
        let path = parts.next().unwrap_or("").trim_end_matches('/');

        Ok(RepoSpec {
            owner: owner.to_string(),
            name: name.to_string(),
            path: path.to_string(),
            query,
        })
    }

    /// Snapshot tarball URL, honouring a `ref=` query parameter
    fn tarball_url(&self, api_url: &str) -> String {
        let git_ref = self
            .query
            .trim_start_matches('?')
            .split('&')
            .find_map(|pair| pair.strip_prefix("ref="))
            .filter(|r| !r.is_empty());
        match git_ref {
            Some(git_ref) => format!(
                "{api_url}/repos/{}/{}/tarball/{git_ref}",
                self.owner, self.name
            ),
            None => format!("{api_url}/repos/{}/{}/tarball", self.owner, self.name),
        }
    }
}

/// One downloadable file found while listing
#[derive(Debug, Clone, PartialEq, Eq)]
struct DirectoryEntry {
    path: String,
    download_url: String,
    size: u64,
}

/// Contents API entry. Every field is optional so that a missing one can be
/// reported by name.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    path: Option<String>,
    size: Option<u64>,
    download_url: Option<String>,
}

/// The contents API answers with an object for a file and an array for a
/// directory.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing {
    Many(Vec<RawEntry>),
    One(RawEntry),
}

impl Listing {
    fn into_entries(self) -> Vec<RawEntry> {
        match self {
            Listing::Many(entries) => entries,
            Listing::One(entry) => vec![entry],
        }
    }
}

/// Authenticated HTTP access shared by listing and downloads
struct Session {
    client: reqwest::Client,
    user_agent: String,
    token: Option<String>,
}

impl Session {
    async fn get(&self, url: &str) -> FetchResult<Bytes> {
        let mut req = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent);
        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, format!("token {token}"));
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status(),
            });
        }
        Ok(resp.bytes().await?)
    }
}

struct Lister<'a> {
    session: &'a Session,
    base_url: String,
    query: &'a str,
    max_size: u64,
}

impl Lister<'_> {
    /// Recursively list every non-empty file under `path`.
    fn list(&self, path: String) -> BoxFuture<'_, FetchResult<Vec<DirectoryEntry>>> {
        async move {
            let url = format!("{}{}{}", self.base_url, path, self.query);
            tracing::debug!(%url, "listing");
            let body = self.session.get(&url).await?;
            let listing: Listing = serde_json::from_slice(&body)
                .map_err(|source| FetchError::InvalidListing { url, source })?;

            let mut files = Vec::new();
            for entry in listing.into_entries() {
                let is_dir = match entry.kind.as_deref() {
                    Some("dir") => true,
                    Some("file") => false,
                    // Symlinks and submodules are not downloaded.
                    Some(_) => continue,
                    None => return Err(FetchError::MissingField("type")),
                };
                if is_dir {
                    let sub = entry.path.ok_or(FetchError::MissingField("path"))?;
                    files.extend(self.list(sub).await?);
                } else if let Some(file) = self.check_file(entry)? {
                    files.push(file);
                }
            }
            Ok(files)
        }
        .boxed()
    }

    fn check_file(&self, entry: RawEntry) -> FetchResult<Option<DirectoryEntry>> {
        let path = entry.path.ok_or(FetchError::MissingField("path"))?;
        let size = entry.size.ok_or(FetchError::MissingField("size"))?;
        let download_url = entry
            .download_url
            .ok_or(FetchError::MissingField("download_url"))?;

        if size == 0 {
            return Ok(None);
        }
        if self.max_size != 0 && size > self.max_size {
            return Err(FetchError::MaxSizeExceeded {
                path,
                size,
                max: self.max_size,
            });
        }
        Ok(Some(DirectoryEntry {
            path,
            download_url,
            size,
        }))
    }
}

/// Emit every regular file of a repository snapshot whose repository path
/// starts with `prefix`. The snapshot's top-level directory is stripped.
fn walk_snapshot<F>(data: Bytes, prefix: &str, origin: &str, mut emit: F)
where
    F: FnMut(Content) -> bool,
{
    let reader = Compression::detect(&data).reader(data);
    let mut tarball = ::tar::Archive::new(reader);
    let entries = match tarball.entries() {
        Ok(entries) => entries,
        Err(e) => {
            emit(Content::failed(origin, FetchError::Archive(e)));
            return;
        }
    };

    for entry in entries {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                emit(Content::failed(origin, FetchError::Archive(e)));
                return;
            }
        };
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let full = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let Some((_, name)) = full.split_once('/') else {
            continue;
        };
        if !name.starts_with(prefix) {
            continue;
        }

        let declared = entry.size();
        let read = archive::read_member(&mut entry, declared, archive::MAX_MEMBER_SIZE);
        let content = match read {
            (data, Ok(())) => Content::new(name, data),
            (data, Err(e)) => Content {
                path: name.to_string(),
                data: data.into(),
                error: Some(FetchError::Archive(e)),
            },
        };
        let failed = !content.is_ok();
        if !emit(content) || failed {
            return;
        }
    }
}
