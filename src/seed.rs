use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use sea_orm::{EntityTrait, PaginatorTrait};

use crate::database::Database;
use crate::entities;
use crate::services::model::{ModelInput, ModelService};

struct SampleModel {
    name: &'static str,
    description: &'static str,
    avatar: &'static str,
    x_url: Option<&'static str>,
    instagram_url: Option<&'static str>,
    weibo_url: Option<&'static str>,
    patreon_url: Option<&'static str>,
    youtube_url: Option<&'static str>,
}

const SAMPLE_MODELS: &[SampleModel] = &[
    SampleModel {
        name: "张美美",
        description: "Fashion and commercial model with five years of brand campaign work.",
        avatar: "https://images.unsplash.com/photo-1494790108755-2616b612b786?w=400&h=400&fit=crop&crop=face",
        x_url: Some("https://x.com/zhangmeimei"),
        instagram_url: Some("https://instagram.com/zhangmeimei"),
        weibo_url: Some("https://weibo.com/zhangmeimei"),
        patreon_url: Some("https://patreon.com/zhangmeimei"),
        youtube_url: Some("https://youtube.com/@zhangmeimei"),
    },
    SampleModel {
        name: "李丽丽",
        description: "Print model focused on commercial and product photography.",
        avatar: "https://images.unsplash.com/photo-1438761681033-6461ffad8d80?w=400&h=400&fit=crop&crop=face",
        x_url: Some("https://x.com/lilili"),
        instagram_url: Some("https://instagram.com/lilili"),
        weibo_url: Some("https://weibo.com/lilili"),
        patreon_url: None,
        youtube_url: None,
    },
    SampleModel {
        name: "王芳芳",
        description: "New face, quick to adapt to any shooting style.",
        avatar: "https://images.unsplash.com/photo-1544005313-94ddf0286df2?w=400&h=400&fit=crop&crop=face",
        x_url: None,
        instagram_url: Some("https://instagram.com/wangfangfang"),
        weibo_url: Some("https://weibo.com/wangfangfang"),
        patreon_url: None,
        youtube_url: None,
    },
];

impl SampleModel {
    fn to_input(&self) -> ModelInput {
        ModelInput {
            name: Some(self.name.to_string()),
            description: Some(self.description.to_string()),
            avatar: Some(self.avatar.to_string()),
            x_url: self.x_url.map(str::to_string),
            instagram_url: self.instagram_url.map(str::to_string),
            weibo_url: self.weibo_url.map(str::to_string),
            patreon_url: self.patreon_url.map(str::to_string),
            youtube_url: self.youtube_url.map(str::to_string),
        }
    }
}

/// Inserts the sample models into an empty catalog. Returns how many were
/// created; a catalog that already has models is left alone.
pub async fn seed_models(db: Arc<Database>) -> Result<usize> {
    let existing = entities::model::Entity::find()
        .count(&db.conn)
        .await
        .wrap_err("Failed to count models")?;
    if existing > 0 {
        log::info!("Catalog already has {existing} models, skipping seed");
        return Ok(0);
    }

    let service = ModelService::new(db);
    for sample in SAMPLE_MODELS {
        service.create(sample.to_input()).await?;
    }

    log::info!("Seeded {} models", SAMPLE_MODELS.len());
    Ok(SAMPLE_MODELS.len())
}
