use anyhow::Context as _;
use md5::{Digest as _, Md5};
use scraper::{ElementRef, Selector};
use url::Url;

use crate::formats::BookRecord;

const ID_MODULUS: u128 = 100_000_000;

const RATING_WORDS: [(&str, u8); 5] = [
    ("One", 1),
    ("Two", 2),
    ("Three", 3),
    ("Four", 4),
    ("Five", 5),
];

pub(crate) fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow::anyhow!("invalid css selector {css:?}: {err}"))
}

/// Selectors for the fields of one `article.product_pod`.
#[derive(Debug)]
pub struct ItemSelectors {
    title_link: Selector,
    price: Selector,
    rating: Selector,
    availability: Selector,
    image: Selector,
}

impl ItemSelectors {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            title_link: selector("h3 a")?,
            price: selector("p.price_color")?,
            rating: selector("p.star-rating")?,
            availability: selector("p.availability")?,
            image: selector("img")?,
        })
    }
}

/// Builds a [`BookRecord`] from one catalog item.
///
/// Relative links are resolved against `page_url`, the listing page the item
/// was found on.
pub fn extract_book(
    selectors: &ItemSelectors,
    item: ElementRef<'_>,
    category: &str,
    page_url: &Url,
) -> anyhow::Result<BookRecord> {
    let title_link = item
        .select(&selectors.title_link)
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing title link"))?;
    let title = title_link
        .value()
        .attr("title")
        .ok_or_else(|| anyhow::anyhow!("missing title attribute"))?
        .to_owned();
    let href = title_link
        .value()
        .attr("href")
        .ok_or_else(|| anyhow::anyhow!("missing detail link for {title:?}"))?;
    let href = page_url
        .join(href)
        .with_context(|| format!("resolve detail link {href:?}"))?;

    let price = item
        .select(&selectors.price)
        .next()
        .map(element_text)
        .ok_or_else(|| anyhow::anyhow!("missing price for {title:?}"))?;

    let rating = item
        .select(&selectors.rating)
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing star rating for {title:?}"))?
        .value()
        .classes()
        .find(|class| *class != "star-rating")
        .map(parse_rating)
        .unwrap_or(0);

    let availability = item
        .select(&selectors.availability)
        .next()
        .map(element_text)
        .ok_or_else(|| anyhow::anyhow!("missing availability for {title:?}"))?;

    let image_src = item
        .select(&selectors.image)
        .next()
        .and_then(|img| img.value().attr("src"))
        .ok_or_else(|| anyhow::anyhow!("missing image for {title:?}"))?;
    let image_url = page_url
        .join(image_src)
        .with_context(|| format!("resolve image path {image_src:?}"))?;

    Ok(BookRecord {
        id: book_id(&title, category),
        title,
        href: href.to_string(),
        price: clean_price(&price),
        rating,
        availability,
        category: category.to_owned(),
        image_url: image_url.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

/// Parses a displayed price such as `£51.77` or `12,50 €`.
///
/// Without a period, commas either group thousands (`1,234`) or mark the
/// decimals (`12,50`). Input mixing both separators is not parsed. Unparseable
/// input yields `0.0`.
pub fn clean_price(raw: &str) -> f64 {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    let normalized = if kept.contains(',') && !kept.contains('.') {
        if is_thousands_grouped(&kept) {
            kept.replace(',', "")
        } else {
            kept.replace(',', ".")
        }
    } else {
        kept
    };

    match normalized.parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => price,
        Ok(_) | Err(_) => {
            tracing::debug!(raw, "unparseable price; using 0.0");
            0.0
        }
    }
}

fn is_thousands_grouped(digits: &str) -> bool {
    let mut groups = digits.split(',');
    let lead_ok = groups
        .next()
        .is_some_and(|lead| (1..=3).contains(&lead.len()));
    lead_ok && groups.all(|group| group.len() == 3)
}

pub fn parse_rating(word: &str) -> u8 {
    RATING_WORDS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, value)| *value)
        .unwrap_or(0)
}

/// Stable id derived from title and category.
///
/// Distinct books may collide; downstream treats the id as a table key only.
pub fn book_id(title: &str, category: &str) -> u32 {
    let digest = Md5::digest(format!("{title}_{category}").as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    (u128::from_be_bytes(bytes) % ID_MODULUS) as u32
}
