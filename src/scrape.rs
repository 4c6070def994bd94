use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cli::{ScrapeArgs, ScraperArgs};
use crate::crawl::crawl_category;
use crate::discover::discover_categories;
use crate::fetch::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT, Fetcher, HttpFetcher};
use crate::formats::{BookRecord, CategoryRef};

pub const DEFAULT_BASE_URL: &str = "https://books.toscrape.com/";
pub const DEFAULT_MAX_WORKERS: usize = 10;

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: Url,
    pub max_workers: usize,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Cancels the run once elapsed; `None` lets every category finish.
    pub deadline: Option<Duration>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            max_workers: DEFAULT_MAX_WORKERS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            deadline: None,
        }
    }
}

impl ScraperConfig {
    pub fn from_args(args: &ScraperArgs) -> anyhow::Result<Self> {
        let base_url = Url::parse(&args.base_url).context("parse --base-url")?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            anyhow::bail!("--base-url must be http/https: {base_url}");
        }
        if args.max_workers == 0 {
            anyhow::bail!("--max-workers must be at least 1");
        }

        let user_agent = std::env::var("BOOKSCRAPE_USER_AGENT")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());

        Ok(Self {
            base_url,
            max_workers: args.max_workers,
            request_timeout: Duration::from_secs(args.timeout_secs.max(1)),
            user_agent,
            deadline: args.deadline_secs.map(Duration::from_secs),
        })
    }
}

/// Crawls every category of the catalog on a bounded pool of workers.
pub struct BookScraper {
    fetcher: Arc<dyn Fetcher>,
    base_url: Url,
    max_workers: usize,
    deadline: Option<Duration>,
}

impl BookScraper {
    pub fn new(config: &ScraperConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(&config.user_agent, config.request_timeout)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    pub fn with_fetcher(config: &ScraperConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            base_url: config.base_url.clone(),
            max_workers: config.max_workers.max(1),
            deadline: config.deadline,
        }
    }

    pub async fn scrape_all(&self) -> Vec<BookRecord> {
        self.scrape_all_with_cancel(CancellationToken::new()).await
    }

    /// Books from all categories, concatenated in the order categories finish.
    ///
    /// Never fails: categories that cannot be crawled contribute nothing, and
    /// an unreachable catalog yields an empty list. When the configured
    /// deadline elapses, `cancel` is fired and the books collected so far are
    /// returned.
    pub async fn scrape_all_with_cancel(&self, cancel: CancellationToken) -> Vec<BookRecord> {
        let Some(deadline) = self.deadline else {
            return self.crawl_all(&cancel).await;
        };

        let run = self.crawl_all(&cancel);
        tokio::pin!(run);
        tokio::select! {
            books = &mut run => return books,
            _ = tokio::time::sleep(deadline) => {
                tracing::warn!(?deadline, "scrape deadline reached; cancelling");
                cancel.cancel();
            }
        }
        run.await
    }

    async fn crawl_all(&self, cancel: &CancellationToken) -> Vec<BookRecord> {
        let categories = tokio::select! {
            biased;
            _ = cancel.cancelled() => Default::default(),
            categories = discover_categories(self.fetcher.as_ref(), &self.base_url) => categories,
        };
        if categories.is_empty() {
            tracing::warn!(url = %self.base_url, "no categories discovered; nothing to crawl");
            return Vec::new();
        }
        let category_count = categories.len();

        let permits = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();
        for (name, url) in categories {
            let category = CategoryRef { name, url };
            let fetcher = Arc::clone(&self.fetcher);
            let permits = Arc::clone(&permits);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .context("acquire crawl worker")?;
                let books = crawl_category(fetcher.as_ref(), &category, &cancel).await;
                Ok::<_, anyhow::Error>((category.name, books))
            });
        }

        let mut all_books = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((category, books))) => {
                    tracing::debug!(category = %category, books = books.len(), "category collected");
                    all_books.extend(books);
                }
                Ok(Err(err)) => {
                    tracing::error!(?err, "category task failed");
                }
                Err(err) => {
                    tracing::error!(?err, "category task aborted");
                }
            }
        }

        tracing::info!(
            categories = category_count,
            books = all_books.len(),
            "scrape finished"
        );
        all_books
    }
}

/// `bookscrape scrape`: one crawl written to a CSV file.
pub async fn run(args: ScrapeArgs) -> anyhow::Result<()> {
    let config = ScraperConfig::from_args(&args.scraper).context("scraper config")?;
    let scraper = BookScraper::new(&config).context("build scraper")?;
    let store = crate::store::CsvBookStore::new(&args.out);
    let runner = crate::app::runner::ScrapeRunner::new(scraper, Arc::new(store));

    let summary = runner.run().await?;
    println!("{} books written to {}", summary.books, args.out);
    Ok(())
}
