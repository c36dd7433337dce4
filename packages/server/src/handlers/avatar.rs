use axum::Json;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::models::avatar::{AvatarListQuery, AvatarListResponse, AvatarResponse, Pagination};
use crate::services::avatar::UploadRequest;
use crate::state::AppState;

/// Request bodies larger than this are rejected before the handler runs.
/// The per-file bound (`avatar.max_upload_size`) is checked while reading.
pub fn avatar_upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(1024 * 1024) // 1 MB
}

#[utoipa::path(
    post,
    path = "/avatar/{student_id}/avatar",
    tag = "Avatars",
    operation_id = "uploadAvatar",
    summary = "Upload a student's avatar",
    description = "Uploads an image as the avatar of a student. The `avatar` multipart field \
        (or `file`) is required and must carry a filename with an extension and an `image/*` \
        content type. A 100px wide JPEG preview is generated and stored alongside the metadata. \
        Re-uploading replaces the previous avatar and keeps its id.",
    params(("student_id" = i32, Path, description = "Student ID")),
    request_body(content_type = "multipart/form-data", description = "Image upload"),
    responses(
        (status = 200, description = "Avatar stored", body = AvatarResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Student not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Storage or image processing failure (UPLOAD_FAILED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<AvatarResponse>, AppError> {
    let max_size = state.config.avatar.max_upload_size;
    let mut upload: Option<UploadRequest> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("avatar") | Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);

                let mut data = Vec::new();
                let mut too_large = false;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
                {
                    // Oversized fields are still drained; the body limit bounds this.
                    if too_large || (data.len() + chunk.len()) as u64 > max_size {
                        too_large = true;
                        continue;
                    }
                    data.extend_from_slice(&chunk);
                }

                if too_large {
                    return Err(AppError::Validation(format!(
                        "File is too large (max {} KB)",
                        max_size / 1024
                    )));
                }

                upload = Some(UploadRequest {
                    file_name,
                    content_type,
                    data,
                });
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let upload = upload.ok_or_else(|| AppError::Validation("Missing 'avatar' field".into()))?;
    let saved = state.avatars.upload_avatar(student_id, upload).await?;

    Ok(Json(saved.into()))
}

#[utoipa::path(
    get,
    path = "/avatar/{student_id}/cover/preview",
    tag = "Avatars",
    operation_id = "getAvatarPreview",
    summary = "Get the avatar preview",
    description = "Returns the stored preview bytes of a student's avatar. The `Content-Type` \
        header carries the media type recorded for the upload.",
    params(("student_id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Preview image bytes", content_type = "image/jpeg"),
        (status = 404, description = "No avatar or preview (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_preview(
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
) -> Result<Response, AppError> {
    let (data, media_type) = state.avatars.get_preview(student_id).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, media_type)
        .header(header::CONTENT_LENGTH, data.len().to_string())
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    get,
    path = "/avatar/{student_id}/cover",
    tag = "Avatars",
    operation_id = "getAvatarCover",
    summary = "Download the original avatar",
    description = "Streams the originally uploaded file from disk.",
    params(("student_id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Original image bytes", content_type = "application/octet-stream"),
        (status = 404, description = "No avatar, or its file is missing (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_cover(
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
) -> Result<Response, AppError> {
    let file = state.avatars.stream_original(student_id).await?;

    let body = Body::from_stream(ReaderStream::new(file.reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.media_type)
        .header(header::CONTENT_LENGTH, file.size.to_string())
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    get,
    path = "/avatar",
    tag = "Avatars",
    operation_id = "listAvatars",
    summary = "List avatars",
    description = "Returns a paginated list of avatar metadata ordered by id. Preview bytes are \
        not included.",
    params(AvatarListQuery),
    responses(
        (status = 200, description = "Avatar list", body = AvatarListResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_avatars(
    State(state): State<AppState>,
    Query(query): Query<AvatarListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (page, per_page) = query.resolve();
    let (avatars, total) = state.avatars.list_avatars(page - 1, per_page).await?;

    Ok(Json(AvatarListResponse {
        data: avatars.into_iter().map(AvatarResponse::from).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}
