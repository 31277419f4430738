/// Default source hosting API root
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Default user agent sent with every HTTP request
pub const USER_AGENT: &str = concat!("arl/", env!("CARGO_PKG_VERSION"));

/// Settings shared by every backend resolver
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Root of the source hosting REST API
    pub github_api_url: String,
    /// User agent attached to HTTP and source hosting requests
    pub user_agent: String,
    /// Shared HTTP client
    pub http_client: reqwest::Client,
}

impl FetchConfig {
    pub fn new() -> Self {
        FetchConfig {
            github_api_url: GITHUB_API_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Point the source hosting backend at another API root (for
    /// self-hosted instances and tests)
    pub fn with_github_api_url(mut self, url: impl Into<String>) -> Self {
        self.github_api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::new()
    }
}
