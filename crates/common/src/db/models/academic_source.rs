//! Academic source entity (the comparison corpus)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Corpus row without its embedding.
///
/// The `embedding vector(N)` column is not mapped here: it is written and
/// compared through raw statements that cast to `::vector`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "academic_sources")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text", unique)]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub authors: Option<String>,

    pub publication_year: Option<i32>,

    #[sea_orm(column_name = "abstract", column_type = "Text", nullable)]
    pub abstract_text: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub full_text: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub source_type: String,
}

impl Model {
    /// Text the stored embedding is computed from
    pub fn embedding_input(&self) -> &str {
        embedding_input(
            &self.title,
            self.abstract_text.as_deref(),
            self.full_text.as_deref(),
        )
    }
}

/// Full text, falling back to the abstract, falling back to the title
pub fn embedding_input<'a>(
    title: &'a str,
    abstract_text: Option<&'a str>,
    full_text: Option<&'a str>,
) -> &'a str {
    full_text
        .filter(|t| !t.trim().is_empty())
        .or_else(|| abstract_text.filter(|t| !t.trim().is_empty()))
        .unwrap_or(title)
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_input_fallbacks() {
        assert_eq!(embedding_input("T", Some("A"), Some("F")), "F");
        assert_eq!(embedding_input("T", Some("A"), Some("  ")), "A");
        assert_eq!(embedding_input("T", None, None), "T");
        assert_eq!(embedding_input("T", Some(""), None), "T");
    }
}
