//! Academic source corpus maintenance

use acadhelper_common::db::models::AcademicSource;
use acadhelper_common::db::NewAcademicSource;
use acadhelper_common::errors::{AppError, Result};
use acadhelper_common::{Embedder, Repository};
use std::sync::Arc;
use tracing::{info, instrument};

/// Inserts or refreshes corpus sources with a freshly computed embedding
pub struct CorpusService {
    repo: Repository,
    embedder: Arc<dyn Embedder>,
}

impl CorpusService {
    pub fn new(repo: Repository, embedder: Arc<dyn Embedder>) -> Self {
        Self { repo, embedder }
    }

    /// Upsert by title; the embedding is recomputed every time
    #[instrument(skip(self, source), fields(title = %source.title))]
    pub async fn upsert(&self, source: NewAcademicSource) -> Result<AcademicSource> {
        if source.title.trim().is_empty() {
            return Err(AppError::Validation {
                message: "Title must not be empty".to_string(),
                field: Some("title".to_string()),
            });
        }

        let embedding = self.embedder.embed(source.embedding_input()).await?;
        let stored = self.repo.upsert_academic_source(&source, &embedding).await?;

        info!(source_id = stored.id, model = self.embedder.model_name(), "Source upserted");
        Ok(stored)
    }
}
