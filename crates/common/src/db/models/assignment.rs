//! Uploaded assignment entity
//!
//! Created with no text on upload; `original_text` and `word_count` are
//! filled in once the extraction workflow calls back.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub student_id: i32,

    #[sea_orm(column_type = "Text")]
    pub filename: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub original_text: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub topic: String,

    #[sea_orm(column_type = "Text")]
    pub academic_level: String,

    pub word_count: i32,

    pub uploaded_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether the extraction workflow has delivered text yet
    pub fn has_text(&self) -> bool {
        self.original_text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,

    #[sea_orm(has_many = "super::analysis_result::Entity")]
    AnalysisResults,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::analysis_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AnalysisResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
