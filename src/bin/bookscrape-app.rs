use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;

use bookscrape::app::routes::{AppState, router};
use bookscrape::app::runner::ScrapeRunner;
use bookscrape::cli::ScraperArgs;
use bookscrape::scrape::{BookScraper, ScraperConfig};
use bookscrape::store::{BookStore, CsvBookStore};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// CSV file the trigger endpoint replaces.
    #[arg(long, default_value = "data/books.csv")]
    data_file: PathBuf,

    #[command(flatten)]
    scraper: ScraperArgs,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    bookscrape::logging::init_with_default_filter("info,tower_http=debug")?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting bookscrape-app");

    let trigger_token = std::env::var("BOOKSCRAPE_TRIGGER_TOKEN")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    if trigger_token.is_none() {
        tracing::warn!("BOOKSCRAPE_TRIGGER_TOKEN is not set; the trigger endpoint is open");
    }

    let config = ScraperConfig::from_args(&args.scraper).context("scraper config")?;
    let scraper = BookScraper::new(&config).context("build scraper")?;
    let store: Arc<dyn BookStore> = Arc::new(CsvBookStore::new(&args.data_file));
    let runner = Arc::new(ScrapeRunner::new(scraper, Arc::clone(&store)));

    let state = AppState::new(runner, store, trigger_token);
    if let Err(err) = state.reload_books().await {
        tracing::error!(?err, data_file = %args.data_file.display(), "load books at startup");
    }

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(?err, "listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
