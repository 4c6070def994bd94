//! Fake catalog origin shared by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::fetch::{FetchedPage, Fetcher};
use crate::formats::BookRecord;
use crate::scrape::{BookScraper, ScraperConfig};
use crate::store::BookStore;

pub const BASE: &str = "https://example.test/";

pub fn home(categories: &[&str]) -> String {
    let links: String = categories
        .iter()
        .map(|c| format!(r#"<li><a href="catalogue/{c}/index.html">{c}</a></li>"#))
        .collect();
    format!(
        r##"<div class="side_categories"><ul class="nav nav-list"><li><a href="#">Books</a><ul>{links}</ul></li></ul></div>"##
    )
}

pub fn listing(category: &str, count: usize) -> String {
    let items: String = (0..count)
        .map(|i| {
            format!(
                r#"<li><article class="product_pod">
  <img src="../../media/{category}-{i}.jpg">
  <p class="star-rating Five"></p>
  <h3><a href="../../{category}-{i}/index.html" title="{category} book {i}">x</a></h3>
  <p class="price_color">£1.00</p>
  <p class="availability">In stock</p>
</article></li>"#
            )
        })
        .collect();
    format!(r#"<ol class="row">{items}</ol>"#)
}

/// Serves a fake catalog and tracks how many requests are in flight.
pub struct FakeCatalog {
    pub pages: HashMap<String, String>,
    pub panic_on: Option<String>,
    pub delay: Duration,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub requests: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn new(categories: &[&str], books_per_category: usize) -> Self {
        let mut pages = HashMap::new();
        pages.insert(BASE.to_string(), home(categories));
        for c in categories {
            pages.insert(
                format!("{BASE}catalogue/{c}/index.html"),
                listing(c, books_per_category),
            );
        }
        Self {
            pages,
            panic_on: None,
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Fetcher for FakeCatalog {
    async fn get(&self, url: &Url) -> anyhow::Result<FetchedPage> {
        self.requests.lock().unwrap().push(url.to_string());
        if self.panic_on.as_deref() == Some(url.as_str()) {
            panic!("unexpected failure for {url}");
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(match self.pages.get(url.as_str()) {
            Some(body) => FetchedPage {
                status: 200,
                body: body.clone(),
            },
            None => FetchedPage {
                status: 404,
                body: String::new(),
            },
        })
    }
}

/// In-memory [`BookStore`] that can be told to fail writes.
#[derive(Default)]
pub struct MemoryStore {
    pub books: Mutex<Vec<BookRecord>>,
    pub fail_writes: bool,
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn replace(&self, books: &[BookRecord]) -> anyhow::Result<()> {
        if self.fail_writes {
            anyhow::bail!("disk full");
        }
        *self.books.lock().unwrap() = books.to_vec();
        Ok(())
    }

    async fn load(&self) -> anyhow::Result<Vec<BookRecord>> {
        Ok(self.books.lock().unwrap().clone())
    }
}

pub fn scraper_for(catalog: Arc<FakeCatalog>) -> BookScraper {
    let config = ScraperConfig {
        base_url: Url::parse(BASE).unwrap(),
        ..ScraperConfig::default()
    };
    BookScraper::with_fetcher(&config, catalog)
}
