//! Idempotent table bootstrap
//!
//! Creates the pgvector extension and the four tables when they are missing.
//! Existing tables are left untouched; there is no migration history.

use crate::errors::Result;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use tracing::info;

/// DDL statements, in dependency order, for a corpus of `dimension`-wide vectors
pub fn schema_statements(dimension: usize) -> Vec<String> {
    vec![
        "CREATE EXTENSION IF NOT EXISTS vector".to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id SERIAL PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            full_name TEXT,
            student_id TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#.to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS assignments (
            id SERIAL PRIMARY KEY,
            student_id INTEGER NOT NULL REFERENCES students(id),
            filename TEXT NOT NULL,
            original_text TEXT,
            topic TEXT NOT NULL DEFAULT 'Unknown',
            academic_level TEXT NOT NULL DEFAULT 'Undergraduate',
            word_count INTEGER NOT NULL DEFAULT 0,
            uploaded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#.to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS analysis_results (
            id SERIAL PRIMARY KEY,
            assignment_id INTEGER NOT NULL REFERENCES assignments(id),
            suggested_sources TEXT NOT NULL DEFAULT '[]',
            plagiarism_score DOUBLE PRECISION NOT NULL DEFAULT 0,
            flagged_sections TEXT NOT NULL DEFAULT '[]',
            research_suggestions TEXT NOT NULL DEFAULT '',
            citation_recommendations TEXT NOT NULL DEFAULT '',
            confidence_score DOUBLE PRECISION NOT NULL DEFAULT 0,
            analyzed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#.to_string(),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS academic_sources (
                id SERIAL PRIMARY KEY,
                title TEXT NOT NULL UNIQUE,
                authors TEXT,
                publication_year INTEGER,
                abstract TEXT,
                full_text TEXT,
                source_type TEXT NOT NULL DEFAULT 'paper',
                embedding vector({dimension})
            )
            "#
        ),
        "CREATE INDEX IF NOT EXISTS idx_analysis_results_assignment ON analysis_results (assignment_id)".to_string(),
    ]
}

/// Run every DDL statement against `conn`
pub async fn bootstrap_schema(conn: &DatabaseConnection, dimension: usize) -> Result<()> {
    let statements = schema_statements(dimension);
    for sql in &statements {
        conn.execute_unprepared(sql).await?;
    }

    info!(statements = statements.len(), dimension, "Database schema ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_column_uses_configured_dimension() {
        let statements = schema_statements(768);
        assert!(statements.iter().any(|s| s.contains("embedding vector(768)")));
        assert!(statements[0].contains("CREATE EXTENSION IF NOT EXISTS vector"));
    }

    #[test]
    fn test_statements_are_idempotent() {
        for sql in schema_statements(1536) {
            assert!(sql.contains("IF NOT EXISTS"), "not idempotent: {sql}");
        }
    }
}
