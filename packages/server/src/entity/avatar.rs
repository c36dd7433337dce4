use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "avatar")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// At most one avatar per student.
    #[sea_orm(unique)]
    pub student_id: i32,

    #[sea_orm(belongs_to, from = "student_id", to = "id")]
    pub student: BelongsTo<super::student::Entity>,

    /// Location of the original upload in the avatar directory.
    pub file_path: String,

    /// Size of the original upload in bytes.
    pub file_size: i64,

    /// Declared MIME type of the original upload.
    pub media_type: String,

    /// JPEG-encoded preview.
    pub preview_data: Option<Vec<u8>>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
