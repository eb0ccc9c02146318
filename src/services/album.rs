use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use color_eyre::eyre::{Report, Result, WrapErr, eyre};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionError, TransactionTrait,
};

use crate::database::Database;
use crate::entities;
use crate::services::CatalogError;
use crate::services::query::{
    ListParams, PaginatedResult, apply_multi_column_text_search, apply_pagination,
};

const ENTITY: &str = "Album";

#[derive(Debug, Clone, Default)]
pub struct AlbumInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub image_count: Option<i32>,
    pub video_count: Option<i32>,
    pub model_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct AlbumListParams {
    pub list: ListParams,
    /// Only albums linked to this model
    pub model_id: Option<i64>,
}

#[derive(Debug)]
pub struct AlbumWithModels {
    pub album: entities::album::Model,
    pub models: Vec<entities::model::Model>,
}

/// Membership change needed to go from `current` to `wanted`.
#[derive(Debug, PartialEq, Eq)]
pub struct MembershipDiff {
    pub added: Vec<i64>,
    pub removed: Vec<i64>,
}

impl MembershipDiff {
    pub fn between(current: &BTreeSet<i64>, wanted: &BTreeSet<i64>) -> Self {
        Self {
            added: wanted.difference(current).copied().collect(),
            removed: current.difference(wanted).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub struct AlbumService {
    db: Arc<Database>,
}

impl AlbumService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Lists albums that are not soft-deleted, newest first, with their models attached.
    pub async fn list(&self, params: &AlbumListParams) -> Result<PaginatedResult<AlbumWithModels>> {
        let mut query = entities::album::Entity::find()
            .filter(entities::album::Column::IsDeleted.eq(false));

        if let Some(search) = params.list.search.as_deref() {
            query = apply_multi_column_text_search(
                query,
                vec![
                    entities::album::Column::Name,
                    entities::album::Column::Description,
                ],
                search,
            );
        }

        if let Some(model_id) = params.model_id {
            let album_ids: Vec<i64> = entities::album_model::Entity::find()
                .filter(entities::album_model::Column::ModelId.eq(model_id))
                .all(&self.db.conn)
                .await
                .wrap_err("Failed to load albums for model")?
                .into_iter()
                .map(|link| link.album_id)
                .collect();
            query = query.filter(entities::album::Column::Id.is_in(album_ids));
        }

        let total = query
            .clone()
            .count(&self.db.conn)
            .await
            .wrap_err("Failed to count albums")?;

        let (query, page, limit) = apply_pagination(
            query.order_by_desc(entities::album::Column::CreatedAt),
            params.list.page,
            params.list.limit,
        );

        let albums = query
            .all(&self.db.conn)
            .await
            .wrap_err("Failed to fetch albums")?;

        let ids: Vec<i64> = albums.iter().map(|album| album.id).collect();
        let mut models_by_album = load_models(&self.db.conn, &ids).await?;

        let items = albums
            .into_iter()
            .map(|album| AlbumWithModels {
                models: models_by_album.remove(&album.id).unwrap_or_default(),
                album,
            })
            .collect();

        Ok(PaginatedResult {
            items,
            total,
            page,
            limit,
        })
    }

    /// Looks an album up by id. Soft-deleted albums are still returned.
    pub async fn get(&self, id: i64) -> Result<AlbumWithModels> {
        let album = find_album(&self.db.conn, id).await?;
        let models = load_models(&self.db.conn, &[id])
            .await?
            .remove(&id)
            .unwrap_or_default();

        Ok(AlbumWithModels { album, models })
    }

    /// Creates the album and its model links in one transaction.
    pub async fn create(&self, input: AlbumInput) -> Result<AlbumWithModels> {
        let name = super::require_name(ENTITY, input.name)?;
        let model_ids: BTreeSet<i64> = input.model_ids.into_iter().collect();

        let album = entities::album::ActiveModel {
            name: Set(name),
            description: Set(input.description),
            cover: Set(input.cover),
            image_count: Set(input.image_count.unwrap_or(0)),
            video_count: Set(input.video_count.unwrap_or(0)),
            is_deleted: Set(false),
            ..Default::default()
        };

        let album = self
            .db
            .conn
            .transaction::<_, entities::album::Model, Report>(|txn| {
                Box::pin(async move {
                    let album = album.insert(txn).await.wrap_err("Failed to create album")?;

                    let diff = MembershipDiff::between(&BTreeSet::new(), &model_ids);
                    apply_membership_diff(txn, album.id, &diff).await?;

                    Ok(album)
                })
            })
            .await
            .map_err(flatten_transaction_error)?;

        tracing::info!(album_id = album.id, "Created album '{}'", album.name);
        self.get(album.id).await
    }

    /// Replaces every field of the album. Model membership is diffed against the
    /// stored links and both halves of the change are applied in a single transaction.
    pub async fn update(&self, id: i64, input: AlbumInput) -> Result<AlbumWithModels> {
        let name = super::require_name(ENTITY, input.name)?;
        let existing = find_album(&self.db.conn, id).await?;
        let wanted: BTreeSet<i64> = input.model_ids.into_iter().collect();

        let mut album: entities::album::ActiveModel = existing.into();
        album.name = Set(name);
        album.description = Set(input.description);
        album.cover = Set(input.cover);
        album.image_count = Set(input.image_count.unwrap_or(0));
        album.video_count = Set(input.video_count.unwrap_or(0));

        let diff = self
            .db
            .conn
            .transaction::<_, MembershipDiff, Report>(|txn| {
                Box::pin(async move {
                    album
                        .update(txn)
                        .await
                        .wrap_err_with(|| format!("Failed to update album {id}"))?;

                    let current: BTreeSet<i64> = entities::album_model::Entity::find()
                        .filter(entities::album_model::Column::AlbumId.eq(id))
                        .all(txn)
                        .await
                        .wrap_err("Failed to load album models")?
                        .into_iter()
                        .map(|link| link.model_id)
                        .collect();

                    let diff = MembershipDiff::between(&current, &wanted);
                    apply_membership_diff(txn, id, &diff).await?;

                    Ok(diff)
                })
            })
            .await
            .map_err(flatten_transaction_error)?;

        tracing::info!(
            album_id = id,
            added = ?diff.added,
            removed = ?diff.removed,
            "Updated album"
        );
        self.get(id).await
    }

    /// Flags the album as deleted. Model links are kept.
    pub async fn soft_delete(&self, id: i64) -> Result<()> {
        let existing = find_album(&self.db.conn, id).await?;

        let mut album: entities::album::ActiveModel = existing.into();
        album.is_deleted = Set(true);
        album
            .update(&self.db.conn)
            .await
            .wrap_err_with(|| format!("Failed to delete album {id}"))?;

        tracing::info!(album_id = id, "Soft-deleted album");
        Ok(())
    }
}

async fn find_album<C: ConnectionTrait>(conn: &C, id: i64) -> Result<entities::album::Model> {
    entities::album::Entity::find_by_id(id)
        .one(conn)
        .await
        .wrap_err_with(|| format!("Failed to fetch album {id}"))?
        .ok_or_else(|| CatalogError::NotFound { entity: ENTITY, id }.into())
}

/// Models linked to each of the given albums, including soft-deleted models.
async fn load_models<C: ConnectionTrait>(
    conn: &C,
    album_ids: &[i64],
) -> Result<HashMap<i64, Vec<entities::model::Model>>> {
    if album_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let links = entities::album_model::Entity::find()
        .filter(entities::album_model::Column::AlbumId.is_in(album_ids.iter().copied()))
        .order_by_asc(entities::album_model::Column::ModelId)
        .find_also_related(entities::model::Entity)
        .all(conn)
        .await
        .wrap_err("Failed to load album models")?;

    let mut models_by_album: HashMap<i64, Vec<entities::model::Model>> = HashMap::new();
    for (link, model) in links {
        if let Some(model) = model {
            models_by_album.entry(link.album_id).or_default().push(model);
        }
    }

    Ok(models_by_album)
}

async fn apply_membership_diff<C: ConnectionTrait>(
    conn: &C,
    album_id: i64,
    diff: &MembershipDiff,
) -> Result<()> {
    if !diff.removed.is_empty() {
        entities::album_model::Entity::delete_many()
            .filter(entities::album_model::Column::AlbumId.eq(album_id))
            .filter(entities::album_model::Column::ModelId.is_in(diff.removed.iter().copied()))
            .exec(conn)
            .await
            .wrap_err("Failed to unlink models from album")?;
    }

    if !diff.added.is_empty() {
        let now = Utc::now();
        let links = diff
            .added
            .iter()
            .map(|model_id| entities::album_model::ActiveModel {
                album_id: Set(album_id),
                model_id: Set(*model_id),
                created_at: Set(now),
                ..Default::default()
            });

        entities::album_model::Entity::insert_many(links)
            .exec_without_returning(conn)
            .await
            .wrap_err("Failed to link models to album")?;
    }

    Ok(())
}

fn flatten_transaction_error(err: TransactionError<Report>) -> Report {
    match err {
        TransactionError::Connection(db_err) => eyre!(db_err).wrap_err("Database transaction failed"),
        TransactionError::Transaction(report) => report,
    }
}
