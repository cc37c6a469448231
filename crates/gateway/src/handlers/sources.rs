//! Academic source administration

use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

use crate::AppState;
use acadhelper_common::{
    db::{models::AcademicSource, NewAcademicSource},
    errors::Result,
};

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertSourceRequest {
    #[validate(length(min = 1, max = 1000))]
    pub title: String,

    pub authors: Option<String>,

    #[validate(range(min = 0, max = 3000))]
    pub publication_year: Option<i32>,

    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    pub full_text: Option<String>,

    pub source_type: Option<String>,
}

impl From<UpsertSourceRequest> for NewAcademicSource {
    fn from(req: UpsertSourceRequest) -> Self {
        Self {
            title: req.title,
            authors: req.authors,
            publication_year: req.publication_year,
            abstract_text: req.abstract_text,
            full_text: req.full_text,
            source_type: req.source_type.unwrap_or_else(|| "paper".to_string()),
        }
    }
}

/// Insert a source or refresh the one with the same title
pub async fn upsert_source(
    State(state): State<AppState>,
    Json(request): Json<UpsertSourceRequest>,
) -> Result<Json<AcademicSource>> {
    request.validate()?;

    let stored = state.corpus.upsert(request.into()).await?;
    Ok(Json(stored))
}
