//! Avatar upload pipeline and retrieval.
//!
//! An upload is validated, decoded into a JPEG preview, written to the avatar
//! directory as `{dir}/{student_id}.{ext}` and recorded in the database,
//! replacing any previous avatar of the student. Steps from the file write
//! onwards hold the per-student upload lock.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::AvatarConfig;
use common::preview::{self, PreviewError};
use common::storage::{BlobStore, BoxReader, StorageError};
use sea_orm::DbErr;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::entity::avatar;
use crate::repository::{AvatarRepository, AvatarUpsert, OwnerDirectory};
use crate::services::upload_lock::UploadLocks;
use crate::utils::filename::avatar_extension;

#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    InvalidFilename(&'static str),
    #[error("Student {0} not found")]
    OwnerNotFound(i32),
    #[error("Avatar for student {0} not found")]
    AvatarNotFound(i32),
    #[error("Failed to store avatar: {0}")]
    Storage(#[from] StorageError),
    #[error("Unable to read image: {0}")]
    UnreadableImage(String),
    #[error("Failed to generate preview: {0}")]
    PreviewEncoding(String),
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidImageDimensions { width: u32, height: u32 },
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<PreviewError> for AvatarError {
    fn from(err: PreviewError) -> Self {
        match err {
            PreviewError::Unreadable(msg) => Self::UnreadableImage(msg),
            PreviewError::InvalidDimensions { width, height } => {
                Self::InvalidImageDimensions { width, height }
            }
            PreviewError::Encoding(msg) => Self::PreviewEncoding(msg),
        }
    }
}

/// An uploaded avatar file as received from the client.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Original filename, used only for its extension.
    pub file_name: Option<String>,
    /// Declared MIME type.
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// The original avatar file, opened for streaming.
pub struct AvatarFile {
    pub reader: BoxReader,
    pub media_type: String,
    pub size: u64,
}

/// Destination of a student's original avatar file.
pub fn avatar_path(dir: &Path, student_id: i32, extension: &str) -> PathBuf {
    dir.join(format!("{student_id}.{extension}"))
}

pub struct AvatarService {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn AvatarRepository>,
    owners: Arc<dyn OwnerDirectory>,
    locks: UploadLocks,
    avatar_dir: PathBuf,
    preview_width: u32,
}

impl AvatarService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn AvatarRepository>,
        owners: Arc<dyn OwnerDirectory>,
        config: &AvatarConfig,
    ) -> Self {
        Self {
            blobs,
            records,
            owners,
            locks: UploadLocks::new(),
            avatar_dir: config.dir.clone(),
            preview_width: config.preview_width,
        }
    }

    /// Store `request` as the avatar of `student_id`, replacing any previous one.
    ///
    /// The preview is generated from the uploaded bytes before anything is
    /// written, so an unreadable image leaves the previous avatar untouched. If
    /// persisting the record fails, the previous original is put back (or the
    /// new file removed when there was none at that path).
    #[instrument(skip(self, request), fields(file_name = ?request.file_name, size = request.data.len()))]
    pub async fn upload_avatar(
        &self,
        student_id: i32,
        request: UploadRequest,
    ) -> Result<avatar::Model, AvatarError> {
        info!("Starting avatar upload");

        let media_type = validate_upload(&request)?;

        if self.owners.get_owner(student_id).await?.is_none() {
            warn!("Student not found");
            return Err(AvatarError::OwnerNotFound(student_id));
        }

        let extension = avatar_extension(request.file_name.as_deref().unwrap_or_default())
            .map_err(|e| AvatarError::InvalidFilename(e.message()))?;
        let path = avatar_path(&self.avatar_dir, student_id, &extension);
        let file_size = i64::try_from(request.data.len()).unwrap_or(i64::MAX);

        let (data, preview) = self.render_preview(request.data).await?;

        let _guard = self.locks.acquire(student_id).await;
        let previous = self.records.find_by_owner(student_id).await?;
        let file_path = path.to_string_lossy().into_owned();

        // Same destination: keep the current original to restore on failure.
        let backup = match &previous {
            Some(previous) if previous.file_path == file_path => {
                self.blobs.read(&path).await.ok()
            }
            _ => None,
        };
        debug!(
            path = %path.display(),
            replacing = previous.is_some(),
            "Writing avatar file"
        );

        let reader: BoxReader = Box::new(Cursor::new(data));
        self.blobs.write(&path, reader).await?;

        let record = AvatarUpsert {
            student_id,
            file_path,
            file_size,
            media_type,
            preview_data: Some(preview.data),
        };
        let saved = match self.records.upsert(record).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(error = %e, "Saving avatar record failed, rolling back file");
                match backup {
                    Some(bytes) => self.restore_file(&path, &bytes).await,
                    None => self.discard_file(&path).await,
                }
                return Err(e.into());
            }
        };

        // A re-upload with a different extension leaves the old file behind.
        if let Some(previous) = previous
            && previous.file_path != saved.file_path
        {
            self.discard_file(Path::new(&previous.file_path)).await;
        }

        info!(avatar_id = saved.id, "Avatar uploaded");
        Ok(saved)
    }

    /// Decode and scale on the blocking pool. Hands the upload bytes back.
    async fn render_preview(
        &self,
        data: Vec<u8>,
    ) -> Result<(Vec<u8>, preview::Preview), AvatarError> {
        let width = self.preview_width;
        let (data, preview) = tokio::task::spawn_blocking(move || {
            let preview = preview::generate_preview(&data, width);
            (data, preview)
        })
        .await
        .map_err(|e| AvatarError::PreviewEncoding(format!("preview task failed: {e}")))?;
        let preview = preview?;
        debug!(
            width = preview.width,
            height = preview.height,
            bytes = preview.data.len(),
            "Preview generated"
        );
        Ok((data, preview))
    }

    async fn restore_file(&self, path: &Path, bytes: &[u8]) {
        if let Err(e) = self.blobs.put(path, bytes).await {
            warn!(path = %path.display(), error = %e, "Failed to restore previous avatar file");
        }
    }

    async fn discard_file(&self, path: &Path) {
        // Best effort.
        if let Err(e) = self.blobs.delete(path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove avatar file");
        }
    }

    #[instrument(skip(self))]
    pub async fn find_avatar(&self, student_id: i32) -> Result<avatar::Model, AvatarError> {
        self.records
            .find_by_owner(student_id)
            .await?
            .ok_or(AvatarError::AvatarNotFound(student_id))
    }

    /// Preview bytes with the media type recorded for the upload.
    #[instrument(skip(self))]
    pub async fn get_preview(&self, student_id: i32) -> Result<(Vec<u8>, String), AvatarError> {
        let record = self.find_avatar(student_id).await?;
        match record.preview_data {
            Some(data) if !data.is_empty() => Ok((data, record.media_type)),
            _ => {
                debug!("Avatar has no preview");
                Err(AvatarError::AvatarNotFound(student_id))
            }
        }
    }

    /// Open the original upload. A missing record, an empty path and a file
    /// missing from disk all yield `AvatarNotFound`.
    #[instrument(skip(self))]
    pub async fn stream_original(&self, student_id: i32) -> Result<AvatarFile, AvatarError> {
        let record = self.find_avatar(student_id).await?;
        if record.file_path.is_empty() {
            return Err(AvatarError::AvatarNotFound(student_id));
        }

        let path = PathBuf::from(&record.file_path);
        let missing = |e: StorageError| match e {
            StorageError::NotFound(_) | StorageError::InvalidPath(_) => {
                warn!(path = %path.display(), "Avatar file missing from storage");
                AvatarError::AvatarNotFound(student_id)
            }
            other => other.into(),
        };

        let size = self.blobs.size(&path).await.map_err(missing)?;
        let reader = self.blobs.open_read(&path).await.map_err(missing)?;

        Ok(AvatarFile {
            reader,
            media_type: record.media_type,
            size,
        })
    }

    /// A page of avatars (0-based) and the total number of avatars.
    #[instrument(skip(self))]
    pub async fn list_avatars(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<avatar::Model>, u64), AvatarError> {
        let (avatars, total) = self.records.list(page, per_page).await?;
        debug!(found = avatars.len(), total, "Listed avatars");
        Ok((avatars, total))
    }
}

/// Checks that need no I/O. Returns the declared media type.
fn validate_upload(request: &UploadRequest) -> Result<String, AvatarError> {
    if request.data.is_empty() {
        return Err(AvatarError::Validation("File is empty".into()));
    }

    request
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|media_type| media_type.starts_with("image/"))
        .map(str::to_string)
        .ok_or_else(|| AvatarError::Validation("File must be an image".into()))
}
