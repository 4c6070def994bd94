use std::collections::BTreeMap;

use scraper::Html;
use url::Url;

use crate::extract::selector;
use crate::fetch::Fetcher;

const CATEGORY_LINKS: &str = "div.side_categories ul.nav-list li ul li a";

/// Maps each category in the site's sidebar to its index page.
///
/// Never fails: any transport or markup problem is logged and yields an empty
/// map.
pub async fn discover_categories(fetcher: &dyn Fetcher, base_url: &Url) -> BTreeMap<String, Url> {
    tracing::info!(url = %base_url, "discovering categories");
    match try_discover_categories(fetcher, base_url).await {
        Ok(categories) => {
            tracing::info!(categories = categories.len(), "categories found");
            categories
        }
        Err(err) => {
            tracing::error!(url = %base_url, ?err, "category discovery failed");
            BTreeMap::new()
        }
    }
}

async fn try_discover_categories(
    fetcher: &dyn Fetcher,
    base_url: &Url,
) -> anyhow::Result<BTreeMap<String, Url>> {
    let page = fetcher.get(base_url).await?;
    if !page.is_success() {
        anyhow::bail!("GET {base_url} returned status {}", page.status);
    }
    parse_categories(&page.body, base_url)
}

pub fn parse_categories(html: &str, base_url: &Url) -> anyhow::Result<BTreeMap<String, Url>> {
    let links = selector(CATEGORY_LINKS)?;
    let document = Html::parse_document(html);

    let mut categories = BTreeMap::new();
    for link in document.select(&links) {
        let name = link.text().collect::<String>().trim().to_owned();
        let Some(href) = link.value().attr("href") else {
            tracing::warn!(category = %name, "category link without href; skipping");
            continue;
        };
        if name.is_empty() {
            continue;
        }
        match base_url.join(href) {
            Ok(url) => {
                categories.insert(name, url);
            }
            Err(err) => {
                tracing::warn!(category = %name, href, %err, "unresolvable category link; skipping");
            }
        }
    }

    Ok(categories)
}
