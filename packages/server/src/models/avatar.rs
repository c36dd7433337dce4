use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::avatar;

pub use super::shared::Pagination;

/// Response DTO for a stored avatar. Preview bytes are served separately.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AvatarResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = 42)]
    pub student_id: i32,
    /// Size of the original upload in bytes.
    #[schema(example = 48213)]
    pub file_size: i64,
    /// MIME type declared for the original upload.
    #[schema(example = "image/png")]
    pub media_type: String,
    /// Size of the stored JPEG preview in bytes, if one exists.
    #[schema(example = 2311)]
    pub preview_size: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<avatar::Model> for AvatarResponse {
    fn from(model: avatar::Model) -> Self {
        Self {
            id: model.id,
            student_id: model.student_id,
            file_size: model.file_size,
            media_type: model.media_type,
            preview_size: model.preview_data.as_ref().map(Vec::len),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Query parameters for avatar listing.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvatarListQuery {
    /// Page number (1-based). Default: 1.
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100). Default: 20.
    #[param(example = 20)]
    pub per_page: Option<u64>,
}

impl AvatarListQuery {
    /// Normalized `(page, per_page)` with `page` 1-based.
    pub fn resolve(&self) -> (u64, u64) {
        let page = Ord::max(self.page.unwrap_or(1), 1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        (page, per_page)
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AvatarListResponse {
    pub data: Vec<AvatarResponse>,
    pub pagination: Pagination,
}
