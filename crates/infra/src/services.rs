use std::sync::Arc;

use anyhow::{Context, bail};
use lingua_domain::ports::completion::CompletionFactRepository;
use lingua_domain::ports::content::ContentGraphRepository;
use lingua_domain::ports::db::DbAdapter;
use lingua_domain::progression::ProgressionService;

use crate::config::{AppConfig, BACKEND_MEMORY, BACKEND_SURREAL};
use crate::db::{self, DbConfig, InMemoryAdapter, SurrealAdapter};
use crate::repositories::{
    InMemoryCompletionFactRepository, InMemoryContentGraphRepository,
    SurrealCompletionFactRepository, SurrealContentGraphRepository,
};

#[derive(Clone)]
pub struct Repositories {
    pub content: Arc<dyn ContentGraphRepository>,
    pub completions: Arc<dyn CompletionFactRepository>,
}

impl Repositories {
    pub fn in_memory(content: InMemoryContentGraphRepository) -> Self {
        Self {
            content: Arc::new(content),
            completions: Arc::new(InMemoryCompletionFactRepository::new()),
        }
    }

    pub fn into_service(self) -> ProgressionService {
        ProgressionService::new(self.content, self.completions)
    }
}

pub async fn build_repositories(config: &AppConfig) -> anyhow::Result<Repositories> {
    let backend = config.data_backend.trim().to_ascii_lowercase();
    match backend.as_str() {
        BACKEND_MEMORY => {
            let adapter = InMemoryAdapter;
            adapter.health_check().await?;
            tracing::info!(backend = adapter.name(), "progression repositories ready");
            Ok(Repositories::in_memory(InMemoryContentGraphRepository::new()))
        }
        BACKEND_SURREAL => {
            let adapter = SurrealAdapter::new(DbConfig::from_app_config(config));
            adapter
                .health_check()
                .await
                .context("surreal health check failed")?;
            let client = db::connect(adapter.config()).await?;
            tracing::info!(backend = adapter.name(), "progression repositories ready");
            Ok(Repositories {
                content: Arc::new(SurrealContentGraphRepository::with_client(client.clone())),
                completions: Arc::new(SurrealCompletionFactRepository::with_client(client)),
            })
        }
        other => bail!("unsupported data_backend '{other}'"),
    }
}

pub async fn progression_service(config: &AppConfig) -> anyhow::Result<ProgressionService> {
    Ok(build_repositories(config).await?.into_service())
}
