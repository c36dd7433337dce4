use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::error::StorageError;
use super::traits::{BlobStore, BoxReader};

/// Filesystem-backed blob store rooted at a base directory.
///
/// Every path handled by the store must lie under the base directory.
/// Writes are staged in `{base_path}/.tmp` and renamed into place, so a file
/// is either absent, the previous version, or the complete new version.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Reject paths outside the base directory or containing `..`.
    fn check_path<'a>(&self, path: &'a Path) -> Result<&'a Path, StorageError> {
        let valid = path.strip_prefix(&self.base_path).is_ok_and(|relative| {
            relative.file_name().is_some()
                && relative
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)))
        });
        if !valid {
            return Err(StorageError::InvalidPath(path.display().to_string()));
        }
        Ok(path)
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn write(&self, path: &Path, mut reader: BoxReader) -> Result<u64, StorageError> {
        let path = self.check_path(path)?;
        let temp_path = self.temp_path();
        let mut total_bytes: u64 = 0;

        let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer
        let mut temp_file = fs::File::create(&temp_path).await?;

        let copied: Result<(), StorageError> = async {
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }

                total_bytes += n as u64;
                if total_bytes > self.max_size {
                    return Err(StorageError::SizeLimitExceeded {
                        actual: total_bytes,
                        limit: self.max_size,
                    });
                }

                temp_file.write_all(&buf[..n]).await?;
            }
            temp_file.flush().await?;
            Ok(())
        }
        .await;
        drop(temp_file);

        if let Err(e) = copied {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Some(parent) = path.parent()
            && let Err(e) = fs::create_dir_all(parent).await
        {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        // rename(2) replaces an existing destination atomically.
        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), bytes = total_bytes, "Blob written");
        Ok(total_bytes)
    }

    async fn open_read(&self, path: &Path) -> Result<BoxReader, StorageError> {
        let path = self.check_path(path)?;
        match fs::File::open(path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        let path = self.check_path(path)?;
        Ok(fs::try_exists(path).await?)
    }

    async fn delete(&self, path: &Path) -> Result<bool, StorageError> {
        let path = self.check_path(path)?;
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, path: &Path) -> Result<u64, StorageError> {
        let path = self.check_path(path)?;
        match fs::metadata(path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
