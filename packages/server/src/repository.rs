//! Persistence seams used by the avatar pipeline.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};

use crate::entity::{avatar, student};

/// Fields written when an avatar is created or replaced.
#[derive(Debug, Clone)]
pub struct AvatarUpsert {
    pub student_id: i32,
    pub file_path: String,
    pub file_size: i64,
    pub media_type: String,
    pub preview_data: Option<Vec<u8>>,
}

/// Avatar metadata store. Holds at most one record per student.
#[async_trait]
pub trait AvatarRepository: Send + Sync {
    async fn find_by_owner(&self, student_id: i32) -> Result<Option<avatar::Model>, DbErr>;

    /// Create the student's avatar, or overwrite it in place keeping its `id`
    /// and `created_at`.
    async fn upsert(&self, record: AvatarUpsert) -> Result<avatar::Model, DbErr>;

    /// One page of avatars ordered by `id`, plus the total count.
    /// `page` is 0-based.
    async fn list(&self, page: u64, per_page: u64) -> Result<(Vec<avatar::Model>, u64), DbErr>;
}

/// Lookup of avatar owners.
#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    async fn get_owner(&self, student_id: i32) -> Result<Option<student::Model>, DbErr>;
}

/// `AvatarRepository` and `OwnerDirectory` backed by the application database.
#[derive(Clone)]
pub struct SeaOrmRepository {
    db: DatabaseConnection,
}

impl SeaOrmRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AvatarRepository for SeaOrmRepository {
    async fn find_by_owner(&self, student_id: i32) -> Result<Option<avatar::Model>, DbErr> {
        avatar::Entity::find()
            .filter(avatar::Column::StudentId.eq(student_id))
            .one(&self.db)
            .await
    }

    async fn upsert(&self, record: AvatarUpsert) -> Result<avatar::Model, DbErr> {
        let now = Utc::now();
        let student_id = record.student_id;

        let model = avatar::ActiveModel {
            student_id: Set(record.student_id),
            file_path: Set(record.file_path),
            file_size: Set(record.file_size),
            media_type: Set(record.media_type),
            preview_data: Set(record.preview_data),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        // Keyed on the unique student_id, so racing writers converge on one row.
        avatar::Entity::insert(model)
            .on_conflict(
                OnConflict::column(avatar::Column::StudentId)
                    .update_columns([
                        avatar::Column::FilePath,
                        avatar::Column::FileSize,
                        avatar::Column::MediaType,
                        avatar::Column::PreviewData,
                        avatar::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        self.find_by_owner(student_id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("avatar missing after upsert".into()))
    }

    async fn list(&self, page: u64, per_page: u64) -> Result<(Vec<avatar::Model>, u64), DbErr> {
        let paginator = avatar::Entity::find()
            .order_by_asc(avatar::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page).await?;

        Ok((items, total))
    }
}

#[async_trait]
impl OwnerDirectory for SeaOrmRepository {
    async fn get_owner(&self, student_id: i32) -> Result<Option<student::Model>, DbErr> {
        student::Entity::find_by_id(student_id).one(&self.db).await
    }
}
