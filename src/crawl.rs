use anyhow::Context as _;
use scraper::Html;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::extract::{ItemSelectors, extract_book, selector};
use crate::fetch::Fetcher;
use crate::formats::{BookRecord, CategoryRef};

const ITEMS: &str = "ol.row li article.product_pod";
const NEXT_PAGE: &str = "li.next";
const INDEX_PAGE: &str = "index.html";

#[derive(Debug)]
pub struct ListingPage {
    pub books: Vec<BookRecord>,
    pub has_next: bool,
}

/// URL of page `page` (1-based) of a category whose first page is `start_url`.
///
/// `.../index.html` becomes `.../page-N.html`; a directory URL gets
/// `page-N.html` appended.
pub fn page_url(start_url: &Url, page: u32) -> anyhow::Result<Url> {
    if page <= 1 {
        return Ok(start_url.clone());
    }

    let path = start_url.path();
    let dir = match path.strip_suffix(INDEX_PAGE) {
        Some(dir) => dir,
        None if path.ends_with('/') => path,
        None => anyhow::bail!("category url does not end in {INDEX_PAGE}: {start_url}"),
    };

    let mut url = start_url.clone();
    url.set_path(&format!("{dir}page-{page}.html"));
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Parses one listing page. Items that fail extraction are logged and skipped.
pub fn parse_listing(
    html: &str,
    category: &str,
    page_url: &Url,
    page: u32,
) -> anyhow::Result<ListingPage> {
    let items = selector(ITEMS)?;
    let next = selector(NEXT_PAGE)?;
    let fields = ItemSelectors::new()?;
    let document = Html::parse_document(html);

    let mut books = Vec::new();
    for item in document.select(&items) {
        match extract_book(&fields, item, category, page_url) {
            Ok(book) => books.push(book),
            Err(err) => {
                tracing::warn!(category, page, ?err, "skipping malformed book");
            }
        }
    }

    Ok(ListingPage {
        books,
        has_next: document.select(&next).next().is_some(),
    })
}

/// Crawls every page of one category, in page order.
///
/// Stops at the first non-success status, at the first page without a next
/// link, on transport failure, or when `cancel` fires. Whatever was collected
/// up to that point is returned.
pub async fn crawl_category(
    fetcher: &dyn Fetcher,
    category: &CategoryRef,
    cancel: &CancellationToken,
) -> Vec<BookRecord> {
    let mut books = Vec::new();
    let mut page = 1;

    loop {
        let url = match page_url(&category.url, page).context("build page url") {
            Ok(url) => url,
            Err(err) => {
                tracing::error!(category = %category.name, page, ?err, "cannot paginate category");
                break;
            }
        };

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(category = %category.name, page, "crawl cancelled");
                break;
            }
            fetched = fetcher.get(&url) => fetched,
        };
        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(err) => {
                tracing::error!(category = %category.name, page, ?err, "page fetch failed");
                break;
            }
        };
        if !fetched.is_success() {
            tracing::debug!(
                category = %category.name,
                page,
                status = fetched.status,
                "no more pages"
            );
            break;
        }

        let listing = match parse_listing(&fetched.body, &category.name, &url, page) {
            Ok(listing) => listing,
            Err(err) => {
                tracing::error!(category = %category.name, page, ?err, "page parse failed");
                break;
            }
        };
        books.extend(listing.books);
        if !listing.has_next {
            break;
        }
        page += 1;
    }

    tracing::info!(
        category = %category.name,
        url = %category.url,
        books = books.len(),
        "category crawled"
    );
    books
}
