use std::sync::Arc;

use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use color_eyre::eyre::WrapErr;
use serde::{Deserialize, Serialize};

use crate::http_server::error::Report;
use crate::http_server::extract::{Json, Path, Query};
use crate::http_server::http_routes::{MessageResponse, Pagination};
use crate::http_server::state::AppState;
use crate::services::album::{AlbumInput, AlbumListParams, AlbumService, AlbumWithModels};
use crate::services::query::ListParams;

/// The slice of a model embedded in album payloads.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelSummary {
    pub id: i64,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumDto {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub image_count: i32,
    pub video_count: i32,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub models: Vec<ModelSummary>,
}

impl From<AlbumWithModels> for AlbumDto {
    fn from(AlbumWithModels { album, models }: AlbumWithModels) -> Self {
        Self {
            id: album.id,
            name: album.name,
            description: album.description,
            cover: album.cover,
            image_count: album.image_count,
            video_count: album.video_count,
            is_deleted: album.is_deleted,
            created_at: album.created_at,
            updated_at: album.updated_at,
            models: models
                .into_iter()
                .map(|model| ModelSummary {
                    id: model.id,
                    name: model.name,
                    avatar: model.avatar,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlbumPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub image_count: Option<i32>,
    pub video_count: Option<i32>,
    pub model_ids: Option<Vec<i64>>,
}

impl From<AlbumPayload> for AlbumInput {
    fn from(payload: AlbumPayload) -> Self {
        Self {
            name: payload.name,
            description: payload.description,
            cover: payload.cover,
            image_count: payload.image_count,
            video_count: payload.video_count,
            model_ids: payload.model_ids.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub model_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlbumListResponse {
    pub albums: Vec<AlbumDto>,
    pub pagination: Pagination,
}

pub async fn list_albums(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<AlbumListQuery>,
) -> Result<Json<AlbumListResponse>, Report> {
    let result = AlbumService::new(app_state.db.clone())
        .list(&AlbumListParams {
            list: ListParams {
                page: query.page,
                limit: query.limit,
                search: query.search,
            },
            model_id: query.model_id,
        })
        .await
        .wrap_err("Failed to fetch albums")?;

    let pagination = Pagination::from(&result);
    Ok(Json(AlbumListResponse {
        albums: result.items.into_iter().map(AlbumDto::from).collect(),
        pagination,
    }))
}

pub async fn create_album(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<AlbumPayload>,
) -> Result<(StatusCode, Json<AlbumDto>), Report> {
    let album = AlbumService::new(app_state.db.clone())
        .create(payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(album.into())))
}

pub async fn get_album(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<AlbumDto>, Report> {
    let album = AlbumService::new(app_state.db.clone()).get(id).await?;
    Ok(Json(album.into()))
}

pub async fn update_album(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<AlbumPayload>,
) -> Result<Json<AlbumDto>, Report> {
    let album = AlbumService::new(app_state.db.clone())
        .update(id, payload.into())
        .await?;

    Ok(Json(album.into()))
}

pub async fn delete_album(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, Report> {
    AlbumService::new(app_state.db.clone())
        .soft_delete(id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Album deleted".to_string(),
    }))
}
