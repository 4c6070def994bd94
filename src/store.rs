use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;

use crate::formats::BookRecord;

#[async_trait]
pub trait BookStore: Send + Sync {
    /// Replaces the stored books with `books`.
    async fn replace(&self, books: &[BookRecord]) -> anyhow::Result<()>;
    /// All stored books; empty when nothing was stored yet.
    async fn load(&self) -> anyhow::Result<Vec<BookRecord>>;
}

/// Books as a CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvBookStore {
    path: PathBuf,
}

impl CsvBookStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BookStore for CsvBookStore {
    async fn replace(&self, books: &[BookRecord]) -> anyhow::Result<()> {
        let data = encode_csv(books).context("encode books csv")?;
        write_atomic(&self.path, &data).await
    }

    async fn load(&self) -> anyhow::Result<Vec<BookRecord>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("read: {}", self.path.display()));
            }
        };
        decode_csv(&bytes).with_context(|| format!("parse: {}", self.path.display()))
    }
}

pub fn encode_csv(books: &[BookRecord]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());
    if books.is_empty() {
        writer
            .write_record(crate::formats::BOOK_COLUMNS)
            .context("write csv header")?;
    }
    for book in books {
        writer.serialize(book).context("write csv row")?;
    }
    writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("flush csv: {err}"))
}

pub fn decode_csv(bytes: &[u8]) -> anyhow::Result<Vec<BookRecord>> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader
        .deserialize::<BookRecord>()
        .map(|row| row.context("read csv row"))
        .collect()
}

async fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create parent dir: {}", parent.display()))?;
    }

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    fs::write(&tmp_path, data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    if let Err(err) = fs::rename(&tmp_path, path).await {
        if let Err(cleanup) = fs::remove_file(&tmp_path).await {
            tracing::warn!(path = %tmp_path.display(), ?cleanup, "remove tmp file");
        }
        return Err(err).with_context(|| format!("rename tmp to final: {}", path.display()));
    }
    Ok(())
}
