use clap::{Args, Parser, Subcommand};

use crate::scrape::{DEFAULT_BASE_URL, DEFAULT_MAX_WORKERS};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crawl the whole catalog once and write it to a CSV file.
    Scrape(ScrapeArgs),
}

#[derive(Debug, Args)]
pub struct ScrapeArgs {
    /// Output CSV path (replaced if it exists).
    #[arg(long, default_value = "data/books.csv")]
    pub out: String,

    #[command(flatten)]
    pub scraper: ScraperArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ScraperArgs {
    /// Catalog root URL (must be http/https).
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Maximum categories crawled at the same time.
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
    pub max_workers: usize,

    /// Per-request timeout.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Stop crawling after this many seconds and keep what was collected.
    #[arg(long)]
    pub deadline_secs: Option<u64>,
}
