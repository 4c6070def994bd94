use serde::{Deserialize, Serialize};
use url::Url;

/// Column order of the books CSV.
pub const BOOK_COLUMNS: [&str; 8] = [
    "id",
    "title",
    "href",
    "price",
    "rating",
    "availability",
    "category",
    "image_url",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef {
    pub name: String,
    pub url: Url,
}

/// One book as listed on a category page.
///
/// Field order matches [`BOOK_COLUMNS`]; the CSV writer relies on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: u32,
    pub title: String,
    pub href: String,
    pub price: f64,
    pub rating: u8,
    pub availability: String,
    pub category: String,
    pub image_url: String,
}
