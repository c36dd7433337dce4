use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Avatar owner. Rows are managed by the student CRUD surface; this service only reads them.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    pub age: i32,

    #[sea_orm(has_one)]
    pub avatar: HasOne<super::avatar::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
