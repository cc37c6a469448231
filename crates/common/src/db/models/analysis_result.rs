//! Analysis result entity plus the JSON documents it stores

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "analysis_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub assignment_id: i32,

    /// JSON array of [`SuggestedSource`]
    #[sea_orm(column_type = "Text")]
    pub suggested_sources: String,

    pub plagiarism_score: f64,

    /// JSON array of [`FlaggedSection`]
    #[sea_orm(column_type = "Text")]
    pub flagged_sections: String,

    #[sea_orm(column_type = "Text")]
    pub research_suggestions: String,

    #[sea_orm(column_type = "Text")]
    pub citation_recommendations: String,

    pub confidence_score: f64,

    pub analyzed_at: DateTimeWithTimeZone,
}

impl Model {
    /// Decode the stored suggestion list
    pub fn suggested_sources(&self) -> serde_json::Result<Vec<SuggestedSource>> {
        serde_json::from_str(&self.suggested_sources)
    }

    /// Decode the stored flagged chunks
    pub fn flagged_sections(&self) -> serde_json::Result<Vec<FlaggedSection>> {
        serde_json::from_str(&self.flagged_sections)
    }
}

/// A corpus source suggested for the whole document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedSource {
    pub source_id: i32,
    pub title: String,
    pub authors: Option<String>,
    pub year: Option<i32>,
    pub similarity: f64,
}

/// A chunk whose best match met the similarity threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedSection {
    pub chunk_index: usize,
    pub chunk_text_snippet: String,
    pub similarity: f64,
    pub source_id: Option<i32>,
    pub source_title: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assignment::Entity",
        from = "Column::AssignmentId",
        to = "super::assignment::Column::Id"
    )]
    Assignment,
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
