use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::db::{self, DbPool};
use crate::mailer::Mailer;
use crate::storage::ImageStore;

/// Explicitly constructed, dependency-injected handles shared by all
/// handlers. No module-level singletons.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub http_client: reqwest::Client,
    pub mailer: Option<Mailer>,
    pub images: Option<ImageStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn init(config: Arc<Config>) -> Result<Self> {
        let db_pool = db::create_pool(&config.database_url).await?;
        let mailer = Mailer::from_config(&config)?;
        if mailer.is_none() {
            tracing::warn!("SMTP not configured, confirmation emails disabled");
        }
        let images = ImageStore::from_config(&config).await;
        if images.is_none() {
            tracing::warn!("Image bucket not configured, uploads disabled");
        }
        Ok(Self {
            db_pool,
            http_client: reqwest::Client::new(),
            mailer,
            images,
            config,
        })
    }
}
