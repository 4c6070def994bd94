#![forbid(unsafe_code)]

pub mod app;
pub mod cli;
pub mod crawl;
pub mod discover;
pub mod extract;
pub mod fetch;
pub mod formats;
pub mod logging;
pub mod scrape;
pub mod store;

#[cfg(test)]
mod testing;
