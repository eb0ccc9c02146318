use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use crate::database::Database;
use crate::entities;
use crate::services::CatalogError;
use crate::services::query::{
    ListParams, PaginatedResult, apply_multi_column_text_search, apply_pagination,
};

const ENTITY: &str = "Model";

/// Every writable field of a model. Updates replace all of them.
#[derive(Debug, Clone, Default)]
pub struct ModelInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<String>,
    pub x_url: Option<String>,
    pub instagram_url: Option<String>,
    pub weibo_url: Option<String>,
    pub patreon_url: Option<String>,
    pub youtube_url: Option<String>,
}

pub struct ModelService {
    db: Arc<Database>,
}

impl ModelService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Lists models that are not soft-deleted, newest first.
    pub async fn list(&self, params: &ListParams) -> Result<PaginatedResult<entities::model::Model>> {
        let mut query = entities::model::Entity::find()
            .filter(entities::model::Column::IsDeleted.eq(false));

        if let Some(search) = params.search.as_deref() {
            query = apply_multi_column_text_search(
                query,
                vec![
                    entities::model::Column::Name,
                    entities::model::Column::Description,
                ],
                search,
            );
        }

        let total = query
            .clone()
            .count(&self.db.conn)
            .await
            .wrap_err("Failed to count models")?;

        let (query, page, limit) = apply_pagination(
            query.order_by_desc(entities::model::Column::CreatedAt),
            params.page,
            params.limit,
        );

        let items = query
            .all(&self.db.conn)
            .await
            .wrap_err("Failed to fetch models")?;

        Ok(PaginatedResult {
            items,
            total,
            page,
            limit,
        })
    }

    /// Looks a model up by id. Soft-deleted models are still returned.
    pub async fn get(&self, id: i64) -> Result<entities::model::Model> {
        entities::model::Entity::find_by_id(id)
            .one(&self.db.conn)
            .await
            .wrap_err_with(|| format!("Failed to fetch model {id}"))?
            .ok_or_else(|| CatalogError::NotFound { entity: ENTITY, id }.into())
    }

    pub async fn create(&self, input: ModelInput) -> Result<entities::model::Model> {
        let name = super::require_name(ENTITY, input.name)?;

        let model = entities::model::ActiveModel {
            name: Set(name),
            description: Set(input.description),
            avatar: Set(input.avatar),
            x_url: Set(input.x_url),
            instagram_url: Set(input.instagram_url),
            weibo_url: Set(input.weibo_url),
            patreon_url: Set(input.patreon_url),
            youtube_url: Set(input.youtube_url),
            is_deleted: Set(false),
            ..Default::default()
        }
        .insert(&self.db.conn)
        .await
        .wrap_err("Failed to create model")?;

        tracing::info!(model_id = model.id, "Created model '{}'", model.name);
        Ok(model)
    }

    pub async fn update(&self, id: i64, input: ModelInput) -> Result<entities::model::Model> {
        let name = super::require_name(ENTITY, input.name)?;
        let existing = self.get(id).await?;

        let mut model: entities::model::ActiveModel = existing.into();
        model.name = Set(name);
        model.description = Set(input.description);
        model.avatar = Set(input.avatar);
        model.x_url = Set(input.x_url);
        model.instagram_url = Set(input.instagram_url);
        model.weibo_url = Set(input.weibo_url);
        model.patreon_url = Set(input.patreon_url);
        model.youtube_url = Set(input.youtube_url);

        let model = model
            .update(&self.db.conn)
            .await
            .wrap_err_with(|| format!("Failed to update model {id}"))?;

        tracing::info!(model_id = id, "Updated model");
        Ok(model)
    }

    /// Flags the model as deleted. Album links are left untouched.
    pub async fn soft_delete(&self, id: i64) -> Result<()> {
        let existing = self.get(id).await?;

        let mut model: entities::model::ActiveModel = existing.into();
        model.is_deleted = Set(true);
        model
            .update(&self.db.conn)
            .await
            .wrap_err_with(|| format!("Failed to delete model {id}"))?;

        tracing::info!(model_id = id, "Soft-deleted model");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_db;

    fn input(name: &str) -> ModelInput {
        ModelInput {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips_fields() {
        let service = ModelService::new(test_db().await);

        let created = service
            .create(ModelInput {
                name: Some("Alice".into()),
                description: Some("Studio portraits".into()),
                avatar: Some("avatars/1700000000000-alice.png".into()),
                x_url: Some("https://x.com/alice".into()),
                instagram_url: Some("https://instagram.com/alice".into()),
                weibo_url: None,
                patreon_url: Some("https://patreon.com/alice".into()),
                youtube_url: None,
            })
            .await
            .unwrap();

        let fetched = service.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.name, "Alice");
        assert_eq!(fetched.description.as_deref(), Some("Studio portraits"));
        assert_eq!(
            fetched.avatar.as_deref(),
            Some("avatars/1700000000000-alice.png")
        );
        assert_eq!(fetched.x_url.as_deref(), Some("https://x.com/alice"));
        assert!(fetched.weibo_url.is_none());
        assert!(!fetched.is_deleted);
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let service = ModelService::new(test_db().await);

        let err = service.create(ModelInput::default()).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<CatalogError>(),
            Some(&CatalogError::NameRequired { entity: "Model" })
        );
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let service = ModelService::new(test_db().await);

        let err = service.get(42).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<CatalogError>(),
            Some(&CatalogError::NotFound {
                entity: "Model",
                id: 42
            })
        );
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_list_but_not_from_get() {
        let service = ModelService::new(test_db().await);
        let kept = service.create(input("Kept")).await.unwrap();
        let deleted = service.create(input("Deleted")).await.unwrap();

        service.soft_delete(deleted.id).await.unwrap();

        let listed = service.list(&ListParams::default()).await.unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items[0].id, kept.id);

        // Lookup by id deliberately ignores the flag
        let fetched = service.get(deleted.id).await.unwrap();
        assert!(fetched.is_deleted);
    }

    #[tokio::test]
    async fn test_list_search_matches_name_or_description() {
        let service = ModelService::new(test_db().await);
        service.create(input("Alice")).await.unwrap();
        service
            .create(ModelInput {
                name: Some("Bob".into()),
                description: Some("Works with ALICE often".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        service.create(input("Carol")).await.unwrap();

        let listed = service
            .list(&ListParams {
                search: Some("alice".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut names: Vec<_> = listed.items.into_iter().map(|m| m.name).collect();
        names.sort();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    async fn search_names(service: &ModelService, term: &str) -> Vec<String> {
        let listed = service
            .list(&ListParams {
                search: Some(term.into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let mut names: Vec<_> = listed.items.into_iter().map(|m| m.name).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_list_search_treats_wildcards_literally() {
        let service = ModelService::new(test_db().await);
        for name in ["Alice", "Bob", "snake_case", "100% real", "back\\slash"] {
            service.create(input(name)).await.unwrap();
        }

        assert_eq!(search_names(&service, "_").await, vec!["snake_case"]);
        assert_eq!(search_names(&service, "%").await, vec!["100% real"]);
        assert_eq!(search_names(&service, "\\").await, vec!["back\\slash"]);
        assert!(search_names(&service, "a_i").await.is_empty());
    }

    #[tokio::test]
    async fn test_list_search_folds_ascii_case_only() {
        let service = ModelService::new(test_db().await);
        service.create(input("Émile")).await.unwrap();
        service.create(input("MILA")).await.unwrap();

        assert_eq!(search_names(&service, "mila").await, vec!["MILA"]);
        assert_eq!(search_names(&service, "Émile").await, vec!["Émile"]);
        // SQLite's LIKE leaves non-ASCII letters case-sensitive
        assert!(search_names(&service, "émile").await.is_empty());
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let service = ModelService::new(test_db().await);
        for i in 0..5 {
            service.create(input(&format!("Model {i}"))).await.unwrap();
        }

        let listed = service
            .list(&ListParams {
                page: Some(2),
                limit: Some(2),
                search: None,
            })
            .await
            .unwrap();

        assert_eq!(listed.total, 5);
        assert_eq!(listed.page, 2);
        assert_eq!(listed.limit, 2);
        assert_eq!(listed.items.len(), 2);
        assert_eq!(listed.total_pages(), 3);
    }

    #[tokio::test]
    async fn test_update_replaces_all_fields() {
        let service = ModelService::new(test_db().await);
        let created = service
            .create(ModelInput {
                name: Some("Alice".into()),
                x_url: Some("https://x.com/alice".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let updated = service
            .update(
                created.id,
                ModelInput {
                    name: Some("Alice B".into()),
                    youtube_url: Some("https://youtube.com/@alice".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Alice B");
        assert!(updated.x_url.is_none());
        assert_eq!(
            updated.youtube_url.as_deref(),
            Some("https://youtube.com/@alice")
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_are_not_found() {
        let service = ModelService::new(test_db().await);

        assert!(service.update(7, input("Nobody")).await.is_err());
        let err = service.soft_delete(7).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CatalogError>(),
            Some(CatalogError::NotFound { .. })
        ));
    }
}
