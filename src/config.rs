use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default cap on results for API methods that take a limit.
pub const REQUEST_LIMIT: usize = 100_000;
pub const DEFAULT_TARGET_CHUNK_SIZE: u64 = 1000;
pub const DEFAULT_PAGE_SIZE: usize = 100;

pub const DEFAULT_INDEX_BASE_URL: &str = "https://api.pushshift.io/reddit";
pub const DEFAULT_REDDIT_BASE_URL: &str = "https://oauth.reddit.com";
pub const DEFAULT_REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Environment variable naming the credentials file.
pub const CONFIG_ENV: &str = "RETRIEVER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Retriever-wide options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct RetrieverOptions {
    pub retry: RetryPolicy,
    pub target_chunk_size: u64,       // expected documents per time sub-range
    pub request_limit: usize,         // default Limit::AtMost for API methods
    pub page_size: usize,             // items per index page
    pub page_delay: Duration,         // pause between paged/raw index requests
    pub index_base_url: String,
    pub reddit_base_url: String,
    pub reddit_auth_url: String,
    pub progress: bool,
}

impl Default for RetrieverOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            target_chunk_size: DEFAULT_TARGET_CHUNK_SIZE,
            request_limit: REQUEST_LIMIT,
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: Duration::from_secs(1),
            index_base_url: DEFAULT_INDEX_BASE_URL.to_string(),
            reddit_base_url: DEFAULT_REDDIT_BASE_URL.to_string(),
            reddit_auth_url: DEFAULT_REDDIT_AUTH_URL.to_string(),
            progress: true,
        }
    }
}

impl RetrieverOptions {
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.retry.max_retries = n.max(1);
        self
    }
    pub fn with_backoff(mut self, base: Duration, max: Duration, multiplier: f64) -> Self {
        self.retry = RetryPolicy::new(self.retry.max_retries, base, max, multiplier);
        self
    }
    pub fn with_target_chunk_size(mut self, docs: u64) -> Self {
        self.target_chunk_size = docs.max(1);
        self
    }
    pub fn with_request_limit(mut self, n: usize) -> Self {
        self.request_limit = n;
        self
    }
    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = n.max(1);
        self
    }
    pub fn with_page_delay(mut self, d: Duration) -> Self {
        self.page_delay = d;
        self
    }
    pub fn with_index_base_url(mut self, url: impl Into<String>) -> Self {
        self.index_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
    pub fn with_reddit_urls(mut self, base: impl Into<String>, auth: impl Into<String>) -> Self {
        self.reddit_base_url = base.into().trim_end_matches('/').to_string();
        self.reddit_auth_url = auth.into();
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
}

// ----------------------------- Credentials ------------------------------------

fn default_user_agent() -> String {
    format!("retriever/{}", env!("CARGO_PKG_VERSION"))
}

/// Script-app credentials for the official API.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    reddit: Option<Credentials>,
}

impl Credentials {
    /// Parse `{"reddit": {...}}`. A missing `reddit` section yields `None`.
    pub fn from_json_str(s: &str) -> Result<Option<Self>> {
        let cfg: ConfigFile = serde_json::from_str(s).context("parse credentials config")?;
        Ok(cfg.reddit)
    }

    /// Load credentials; a missing or malformed file downgrades to `None`.
    pub fn load(path: &Path) -> Option<Self> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("no credentials config at {}", path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("cannot read credentials config {}: {}", path.display(), e);
                return None;
            }
        };
        match Self::from_json_str(&text) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("ignoring credentials config {}: {:#}", path.display(), e);
                None
            }
        }
    }

    /// Explicit path, else `$RETRIEVER_CONFIG`, else `./config.json`.
    pub fn locate(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        match std::env::var(CONFIG_ENV) {
            Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }
}
