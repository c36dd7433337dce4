use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Path-addressed blob storage for original upload files.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at `path`, replacing any previous file. Returns the byte count.
    async fn put(&self, path: &Path, data: &[u8]) -> Result<u64, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.write(path, reader).await
    }

    /// Store data from an async reader at `path`.
    ///
    /// Readers of `path` observe either the previous file or the complete new
    /// one, never a partial write.
    async fn write(&self, path: &Path, reader: BoxReader) -> Result<u64, StorageError>;

    /// Retrieve all bytes stored at `path`.
    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.open_read(path).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Open the file at `path` as a streaming async reader.
    async fn open_read(&self, path: &Path) -> Result<BoxReader, StorageError>;

    /// Check whether a file exists at `path`.
    async fn exists(&self, path: &Path) -> Result<bool, StorageError>;

    /// Delete the file at `path`.
    ///
    /// Returns `true` if the file was deleted, `false` if it did not exist.
    async fn delete(&self, path: &Path) -> Result<bool, StorageError>;

    /// Get the size of the file at `path` in bytes.
    async fn size(&self, path: &Path) -> Result<u64, StorageError>;
}
