use std::sync::Arc;

use anyhow::Context as _;
use chrono::Utc;

use crate::app::model::ScrapeSummary;
use crate::scrape::BookScraper;
use crate::store::BookStore;

/// Runs a full scrape and replaces the store with its result.
pub struct ScrapeRunner {
    scraper: BookScraper,
    store: Arc<dyn BookStore>,
}

impl ScrapeRunner {
    pub fn new(scraper: BookScraper, store: Arc<dyn BookStore>) -> Self {
        Self { scraper, store }
    }

    /// Fails when the scrape produced no books; the store is left untouched in
    /// that case.
    pub async fn run(&self) -> anyhow::Result<ScrapeSummary> {
        let started_at = Utc::now();
        tracing::info!("scrape started");

        let books = self.scraper.scrape_all().await;
        if books.is_empty() {
            anyhow::bail!("no books extracted during scraping");
        }

        self.store
            .replace(&books)
            .await
            .context("save scraped books")?;

        let summary = ScrapeSummary {
            books: books.len(),
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(books = summary.books, "scrape completed; books saved");
        Ok(summary)
    }
}
