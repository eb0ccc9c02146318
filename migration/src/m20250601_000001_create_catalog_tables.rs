use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create models table
        manager
            .create_table(
                Table::create()
                    .table("models")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new("name").string().not_null())
                    .col(ColumnDef::new("description").string())
                    .col(ColumnDef::new("avatar").string())
                    .col(ColumnDef::new("x_url").string())
                    .col(ColumnDef::new("instagram_url").string())
                    .col(ColumnDef::new("weibo_url").string())
                    .col(ColumnDef::new("patreon_url").string())
                    .col(ColumnDef::new("youtube_url").string())
                    .col(
                        ColumnDef::new("is_deleted")
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new("created_at").timestamp().not_null())
                    .col(ColumnDef::new("updated_at").timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Create albums table
        manager
            .create_table(
                Table::create()
                    .table("albums")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new("name").string().not_null())
                    .col(ColumnDef::new("description").string())
                    .col(ColumnDef::new("cover").string())
                    .col(
                        ColumnDef::new("image_count")
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new("video_count")
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new("is_deleted")
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new("created_at").timestamp().not_null())
                    .col(ColumnDef::new("updated_at").timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Create album_models junction table
        manager
            .create_table(
                Table::create()
                    .table("album_models")
                    .if_not_exists()
                    .col(ColumnDef::new("album_id").integer().not_null())
                    .col(ColumnDef::new("model_id").integer().not_null())
                    .col(ColumnDef::new("created_at").timestamp().not_null())
                    .primary_key(Index::create().col("album_id").col("model_id"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_album_models_album_id")
                            .from("album_models", "album_id")
                            .to("albums", "id")
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_album_models_model_id")
                            .from("album_models", "model_id")
                            .to("models", "id"),
                    )
                    .to_owned(),
            )
            .await?;

        // Create indexes
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_models_is_deleted_created_at")
                    .table("models")
                    .col("is_deleted")
                    .col("created_at")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_albums_is_deleted_created_at")
                    .table("albums")
                    .col("is_deleted")
                    .col("created_at")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_album_models_model_id")
                    .table("album_models")
                    .col("model_id")
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order
        manager
            .drop_table(Table::drop().table("album_models").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table("albums").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table("models").to_owned())
            .await?;

        Ok(())
    }
}
