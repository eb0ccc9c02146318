use std::sync::Arc;

use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use color_eyre::eyre::WrapErr;
use serde::{Deserialize, Serialize};

use crate::entities;
use crate::http_server::error::Report;
use crate::http_server::extract::{Json, Path, Query};
use crate::http_server::http_routes::{MessageResponse, Pagination};
use crate::http_server::state::AppState;
use crate::services::model::{ModelInput, ModelService};
use crate::services::query::ListParams;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDto {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub avatar: Option<String>,
    pub x_url: Option<String>,
    pub instagram_url: Option<String>,
    pub weibo_url: Option<String>,
    pub patreon_url: Option<String>,
    pub youtube_url: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<entities::model::Model> for ModelDto {
    fn from(model: entities::model::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            avatar: model.avatar,
            x_url: model.x_url,
            instagram_url: model.instagram_url,
            weibo_url: model.weibo_url,
            patreon_url: model.patreon_url,
            youtube_url: model.youtube_url,
            is_deleted: model.is_deleted,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<String>,
    pub x_url: Option<String>,
    pub instagram_url: Option<String>,
    pub weibo_url: Option<String>,
    pub patreon_url: Option<String>,
    pub youtube_url: Option<String>,
}

impl From<ModelPayload> for ModelInput {
    fn from(payload: ModelPayload) -> Self {
        Self {
            name: payload.name,
            description: payload.description,
            avatar: payload.avatar,
            x_url: payload.x_url,
            instagram_url: payload.instagram_url,
            weibo_url: payload.weibo_url,
            patreon_url: payload.patreon_url,
            youtube_url: payload.youtube_url,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelListResponse {
    pub models: Vec<ModelDto>,
    pub pagination: Pagination,
}

pub async fn list_models(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ModelListQuery>,
) -> Result<Json<ModelListResponse>, Report> {
    let result = ModelService::new(app_state.db.clone())
        .list(&ListParams {
            page: query.page,
            limit: query.limit,
            search: query.search,
        })
        .await
        .wrap_err("Failed to fetch models")?;

    let pagination = Pagination::from(&result);
    Ok(Json(ModelListResponse {
        models: result.items.into_iter().map(ModelDto::from).collect(),
        pagination,
    }))
}

pub async fn create_model(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ModelPayload>,
) -> Result<(StatusCode, Json<ModelDto>), Report> {
    let model = ModelService::new(app_state.db.clone())
        .create(payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(model.into())))
}

pub async fn get_model(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ModelDto>, Report> {
    let model = ModelService::new(app_state.db.clone()).get(id).await?;
    Ok(Json(model.into()))
}

pub async fn update_model(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<ModelPayload>,
) -> Result<Json<ModelDto>, Report> {
    let model = ModelService::new(app_state.db.clone())
        .update(id, payload.into())
        .await?;

    Ok(Json(model.into()))
}

pub async fn delete_model(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, Report> {
    ModelService::new(app_state.db.clone())
        .soft_delete(id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Model deleted".to_string(),
    }))
}
