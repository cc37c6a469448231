//! Nearest-source lookup over the academic corpus
//!
//! The search itself is pgvector's: rows are ordered by cosine distance
//! (`<=>`) and the adapter converts distance to `similarity = 1 - distance`.

use acadhelper_common::db::{vector_literal, DbPool};
use acadhelper_common::errors::Result;
use async_trait::async_trait;
use sea_orm::{DbBackend, FromQueryResult, Statement};
use serde::{Deserialize, Serialize};

/// A corpus source and how close it is to the query vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMatch {
    pub source_id: i32,
    pub title: String,
    pub authors: Option<String>,
    pub publication_year: Option<i32>,
    pub similarity: f64,
}

/// Common trait for corpus lookups
#[async_trait]
pub trait SimilarityMatcher: Send + Sync {
    /// Up to `k` sources ordered by non-increasing similarity
    async fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<SourceMatch>>;
}

/// Order by similarity (descending, stable) and keep the first `k`
///
/// Rows whose similarity is not finite are dropped; pgvector yields NaN
/// distances for all-zero vectors.
pub fn rank_matches(mut matches: Vec<SourceMatch>, k: usize) -> Vec<SourceMatch> {
    matches.retain(|m| m.similarity.is_finite());
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    matches.truncate(k);
    matches
}

/// Query result row
#[derive(Debug, FromQueryResult)]
struct SourceMatchRow {
    id: i32,
    title: String,
    authors: Option<String>,
    publication_year: Option<i32>,
    similarity: f64,
}

impl From<SourceMatchRow> for SourceMatch {
    fn from(row: SourceMatchRow) -> Self {
        Self {
            source_id: row.id,
            title: row.title,
            authors: row.authors,
            publication_year: row.publication_year,
            similarity: row.similarity,
        }
    }
}

/// Matcher backed by the `academic_sources.embedding` pgvector column
pub struct PgVectorMatcher {
    db: DbPool,
}

impl PgVectorMatcher {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    fn build_statement(embedding: &[f32], k: usize) -> Statement {
        Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                id,
                title,
                authors,
                publication_year,
                1 - (embedding <=> $1::vector) AS similarity
            FROM academic_sources
            WHERE embedding IS NOT NULL
            ORDER BY embedding <=> $1::vector
            LIMIT $2
            "#,
            vec![vector_literal(embedding).into(), (k as i64).into()],
        )
    }
}

#[async_trait]
impl SimilarityMatcher for PgVectorMatcher {
    async fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<SourceMatch>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = SourceMatchRow::find_by_statement(Self::build_statement(embedding, k))
            .all(self.db.read())
            .await?;

        tracing::trace!(k, rows = rows.len(), "Vector search complete");

        Ok(rank_matches(rows.into_iter().map(SourceMatch::from).collect(), k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Transaction, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    /// Transaction log of a mock connection once no pool holds it
    fn transaction_log(conn: Arc<DatabaseConnection>) -> Vec<Transaction> {
        Arc::try_unwrap(conn)
            .ok()
            .expect("connection still shared")
            .into_transaction_log()
    }

    fn row(id: i32, title: &str, similarity: f64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("id", Value::from(id)),
            ("title", Value::from(title.to_string())),
            ("authors", Value::from(Some("Doe, J.".to_string()))),
            ("publication_year", Value::from(Some(2020i32))),
            ("similarity", Value::from(similarity)),
        ])
    }

    fn source(id: i32, similarity: f64) -> SourceMatch {
        SourceMatch {
            source_id: id,
            title: format!("S{id}"),
            authors: None,
            publication_year: None,
            similarity,
        }
    }

    #[test]
    fn test_rank_matches_orders_and_truncates() {
        let ranked = rank_matches(vec![source(1, 0.2), source(2, 0.9), source(3, 0.5)], 2);
        assert_eq!(ranked.iter().map(|m| m.source_id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_rank_matches_keeps_first_on_ties() {
        let ranked = rank_matches(vec![source(1, 0.7), source(2, 0.7), source(3, 0.1)], 3);
        assert_eq!(ranked.iter().map(|m| m.source_id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_matches_drops_non_finite_similarity() {
        let ranked = rank_matches(
            vec![source(1, f64::NAN), source(2, 0.4), source(3, f64::INFINITY), source(4, 0.6)],
            3,
        );
        assert_eq!(ranked.iter().map(|m| m.source_id).collect::<Vec<_>>(), vec![4, 2]);
    }

    #[tokio::test]
    async fn test_zero_vector_rows_are_skipped() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(3, "Zero", f64::NAN), row(8, "Real", 0.42)]])
            .into_connection();
        let matcher = PgVectorMatcher::new(DbPool::from_connection(conn));

        let matches = matcher.nearest(&[0.0, 0.0], 5).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source_id, 8);
    }

    #[tokio::test]
    async fn test_pgvector_rows_become_typed_matches() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                row(4, "Low", 0.31),
                row(9, "High", 0.92),
                row(2, "Mid", 0.55),
                row(5, "Lowest", 0.10),
            ]])
            .into_connection();
        let conn = Arc::new(conn);
        let matcher = PgVectorMatcher::new(DbPool::from_connection(conn.clone()));

        let matches = matcher.nearest(&[0.5, 0.5], 3).await.unwrap();

        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].source_id, 9);
        assert_eq!(matches[0].title, "High");
        assert_eq!(matches[0].authors.as_deref(), Some("Doe, J."));
        assert_eq!(matches[0].publication_year, Some(2020));
        for pair in matches.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }

        drop(matcher);
        let log = format!("{:?}", transaction_log(conn));
        assert!(log.contains("<=>"));
        assert!(log.contains("[0.5,0.5]"));
    }

    #[tokio::test]
    async fn test_zero_k_skips_the_query() {
        let conn = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let matcher = PgVectorMatcher::new(DbPool::from_connection(conn.clone()));

        assert!(matcher.nearest(&[1.0], 0).await.unwrap().is_empty());
        drop(matcher);
        assert!(transaction_log(conn).is_empty());
    }
}
