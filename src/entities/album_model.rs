use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "album_models")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub album_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub model_id: i64,
    pub created_at: DateTime<Utc>,

    #[sea_orm(belongs_to, from = "album_id", to = "id")]
    pub album: Option<super::album::Entity>,
    // `model` is taken by the generated code
    #[sea_orm(belongs_to, from = "model_id", to = "id")]
    pub person: Option<super::model::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
