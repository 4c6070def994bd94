use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "bookscrape/0.1";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP GET against the origin.
///
/// A non-success status is a normal response; `Err` is reserved for transport
/// failures (connect, timeout, body read).
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &Url) -> anyhow::Result<FetchedPage>;
}

/// Shared `reqwest` client; clones reuse the same connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build scraper http client")?;

        Ok(Self {
            client,
            user_agent: user_agent.to_owned(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &Url) -> anyhow::Result<FetchedPage> {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .with_context(|| format!("read body: {url}"))?;

        Ok(FetchedPage { status, body })
    }
}
