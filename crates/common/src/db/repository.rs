//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling.

use crate::errors::{AppError, Result};
use crate::db::{vector_literal, DbPool};
use crate::db::models::*;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, Set, Statement,
};
use serde::{Deserialize, Serialize};

/// Fields for a freshly uploaded assignment
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub student_id: i32,
    pub filename: String,
    pub topic: String,
    pub academic_level: String,
}

/// Fields for inserting or refreshing a corpus source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAcademicSource {
    pub title: String,
    pub authors: Option<String>,
    pub publication_year: Option<i32>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub full_text: Option<String>,
    #[serde(default = "default_source_type")]
    pub source_type: String,
}

fn default_source_type() -> String {
    "paper".to_string()
}

impl NewAcademicSource {
    /// Text the embedding should be computed from
    pub fn embedding_input(&self) -> &str {
        embedding_input(
            &self.title,
            self.abstract_text.as_deref(),
            self.full_text.as_deref(),
        )
    }
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Student Operations
    // ========================================================================

    /// Find student by email
    pub async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>> {
        StudentEntity::find()
            .filter(StudentColumn::Email.eq(email))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find student by ID
    pub async fn find_student_by_id(&self, id: i32) -> Result<Option<Student>> {
        StudentEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Create a new student account
    pub async fn create_student(
        &self,
        email: String,
        password_hash: String,
        full_name: Option<String>,
    ) -> Result<Student> {
        let student = StudentActiveModel {
            email: Set(email),
            password_hash: Set(password_hash),
            full_name: Set(full_name),
            student_number: Set(None),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        student.insert(self.write_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Assignment Operations
    // ========================================================================

    /// Create an assignment with no extracted text yet
    pub async fn create_assignment(&self, new: NewAssignment) -> Result<Assignment> {
        let assignment = AssignmentActiveModel {
            student_id: Set(new.student_id),
            filename: Set(new.filename),
            original_text: Set(None),
            topic: Set(new.topic),
            academic_level: Set(new.academic_level),
            word_count: Set(0),
            uploaded_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        assignment.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find assignment by ID
    pub async fn find_assignment_by_id(&self, id: i32) -> Result<Option<Assignment>> {
        AssignmentEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Store extracted text; a missing or zero word count keeps the old value
    pub async fn update_assignment_text(
        &self,
        assignment: Assignment,
        extracted_text: String,
        word_count: Option<i32>,
    ) -> Result<Assignment> {
        let mut active: AssignmentActiveModel = assignment.into();
        active.original_text = Set(Some(extracted_text));

        if let Some(count) = word_count.filter(|c| *c != 0) {
            active.word_count = Set(count);
        }

        active.update(self.write_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Analysis Operations
    // ========================================================================

    /// Insert one analysis row. Rows are never updated afterwards.
    pub async fn create_analysis_result(
        &self,
        assignment_id: i32,
        suggested_sources: &[SuggestedSource],
        plagiarism_score: f64,
        flagged_sections: &[FlaggedSection],
    ) -> Result<AnalysisResult> {
        let result = AnalysisResultActiveModel {
            assignment_id: Set(assignment_id),
            suggested_sources: Set(serde_json::to_string(suggested_sources)?),
            plagiarism_score: Set(plagiarism_score),
            flagged_sections: Set(serde_json::to_string(flagged_sections)?),
            research_suggestions: Set(String::new()),
            citation_recommendations: Set(String::new()),
            confidence_score: Set(0.0),
            analyzed_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        result.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Analysis history for an assignment, newest first
    pub async fn list_analysis_results(&self, assignment_id: i32) -> Result<Vec<AnalysisResult>> {
        AnalysisResultEntity::find()
            .filter(AnalysisResultColumn::AssignmentId.eq(assignment_id))
            .order_by_desc(AnalysisResultColumn::AnalyzedAt)
            .order_by_desc(AnalysisResultColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Corpus Operations
    // ========================================================================

    /// Insert a source or refresh the one with the same title, embedding included
    pub async fn upsert_academic_source(
        &self,
        source: &NewAcademicSource,
        embedding: &[f32],
    ) -> Result<AcademicSource> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO academic_sources (
                title, authors, publication_year, abstract, full_text, source_type, embedding
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7::vector)
            ON CONFLICT (title) DO UPDATE SET
                authors = EXCLUDED.authors,
                publication_year = EXCLUDED.publication_year,
                abstract = EXCLUDED.abstract,
                full_text = EXCLUDED.full_text,
                source_type = EXCLUDED.source_type,
                embedding = EXCLUDED.embedding
            RETURNING id, title, authors, publication_year, abstract, full_text, source_type
            "#,
            vec![
                source.title.clone().into(),
                source.authors.clone().into(),
                source.publication_year.into(),
                source.abstract_text.clone().into(),
                source.full_text.clone().into(),
                source.source_type.clone().into(),
                vector_literal(embedding).into(),
            ],
        );

        AcademicSource::find_by_statement(stmt)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::Internal {
                message: format!("Upsert of source '{}' returned no row", source.title),
            })
    }
}
