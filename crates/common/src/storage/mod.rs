//! Raw PDF file storage
//!
//! The database only keeps a storage key per PDF; the bytes live behind the
//! `PdfStore` trait. `LocalPdfStore` keeps them as flat files in one directory.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Chunk size used when streaming a stored file
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// A stored file opened for streaming
pub struct StoredFile {
    pub len: u64,
    pub stream: BoxStream<'static, std::io::Result<Vec<u8>>>,
}

/// Backend holding uploaded PDF bytes
#[async_trait]
pub trait PdfStore: Send + Sync {
    /// Write bytes under `key`, replacing any existing file
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Open `key` for streaming; `None` if it does not exist
    async fn open(&self, key: &str) -> Result<Option<StoredFile>>;

    /// Read the whole file into memory
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Size in bytes, `None` if missing
    async fn size(&self, key: &str) -> Result<Option<u64>>;

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.size(key).await?.is_some())
    }

    /// Remove `key`; returns false if it was already gone
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Human-readable location of `key`, for diagnostics
    fn locate(&self, key: &str) -> String;
}

/// Generate a storage key for an upload, keeping its extension
///
/// Keys look like `pdf-1718000000000-123456789.pdf`.
pub fn generate_key(original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::random::<u32>() % 1_000_000_000;
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_else(|| ".pdf".to_string());

    format!("pdf-{}-{}{}", millis, suffix, ext)
}

/// Hex SHA-256 of file contents, recorded at upload and re-checked by health
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Filesystem-backed store rooted at one directory
#[derive(Debug, Clone)]
pub struct LocalPdfStore {
    root: PathBuf,
}

impl LocalPdfStore {
    /// Create the store, creating `root` if needed
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains('/')
            && !key.contains('\\');

        if !valid {
            return Err(AppError::Storage {
                message: format!("Invalid storage key: {:?}", key),
            });
        }

        Ok(self.root.join(key))
    }
}

fn not_found_as_none<T>(result: std::io::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl PdfStore for LocalPdfStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        fs::write(&path, bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "Stored PDF file");
        Ok(())
    }

    async fn open(&self, key: &str) -> Result<Option<StoredFile>> {
        let path = self.path_for(key)?;
        let Some(file) = not_found_as_none(File::open(&path).await)? else {
            return Ok(None);
        };
        let len = file.metadata().await?.len();

        let stream = stream::unfold(file, |mut file| async move {
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            match file.read(&mut buf).await {
                Ok(0) => None,
                Ok(n) => {
                    buf.truncate(n);
                    Some((Ok(buf), file))
                }
                Err(e) => Some((Err(e), file)),
            }
        })
        .boxed();

        Ok(Some(StoredFile { len, stream }))
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        not_found_as_none(fs::read(&path).await)
    }

    async fn size(&self, key: &str) -> Result<Option<u64>> {
        let path = self.path_for(key)?;
        Ok(not_found_as_none(fs::metadata(&path).await)?.map(|m| m.len()))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        Ok(not_found_as_none(fs::remove_file(&path).await)?.is_some())
    }

    fn locate(&self, key: &str) -> String {
        self.root.join(key).display().to_string()
    }
}
