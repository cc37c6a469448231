//! Analyze-callback orchestration
//!
//! Stores the extracted text, scores it, computes whole-document source
//! suggestions and appends one analysis record.

use crate::chunker::ChunkingConfig;
use crate::matcher::{SimilarityMatcher, SourceMatch};
use crate::scorer::{PlagiarismScorer, ScoringConfig};
use acadhelper_common::config::AnalysisConfig;
use acadhelper_common::db::models::{AnalysisResult, Assignment, FlaggedSection, SuggestedSource};
use acadhelper_common::errors::{AppError, Result};
use acadhelper_common::{metrics, Embedder, Repository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Callback payload from the extraction workflow
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub assignment_id: i32,
    pub extracted_text: String,
    #[serde(default)]
    pub word_count: Option<i32>,
}

/// What the callback reports back
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub analysis_id: i32,
    pub plagiarism_score: f64,
    pub chunks_count: usize,
    pub flagged_count: usize,
}

/// A stored analysis with its JSON columns decoded
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisView {
    pub id: i32,
    pub plagiarism_score: f64,
    pub suggested_sources: Vec<SuggestedSource>,
    pub flagged_sections: Vec<FlaggedSection>,
    pub analyzed_at: String,
}

impl TryFrom<AnalysisResult> for AnalysisView {
    type Error = AppError;

    fn try_from(result: AnalysisResult) -> Result<Self> {
        Ok(Self {
            id: result.id,
            plagiarism_score: result.plagiarism_score,
            suggested_sources: result.suggested_sources()?,
            flagged_sections: result.flagged_sections()?,
            analyzed_at: result.analyzed_at.to_rfc3339(),
        })
    }
}

/// Assignment plus its analysis history, newest first
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentDetail {
    pub assignment: Assignment,
    pub analyses: Vec<AnalysisView>,
}

impl From<SourceMatch> for SuggestedSource {
    fn from(m: SourceMatch) -> Self {
        Self {
            source_id: m.source_id,
            title: m.title,
            authors: m.authors,
            year: m.publication_year,
            similarity: m.similarity,
        }
    }
}

/// Leading `max_chars` characters of `text`
fn sample(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub struct AnalysisService {
    repo: Repository,
    embedder: Arc<dyn Embedder>,
    matcher: Arc<dyn SimilarityMatcher>,
    scorer: PlagiarismScorer,
    suggestion_top_k: usize,
    suggestion_sample_chars: usize,
}

impl AnalysisService {
    pub fn new(
        repo: Repository,
        embedder: Arc<dyn Embedder>,
        matcher: Arc<dyn SimilarityMatcher>,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        let chunking = ChunkingConfig::new(config.chunk_size, config.chunk_overlap)?;
        let scorer = PlagiarismScorer::new(
            embedder.clone(),
            matcher.clone(),
            chunking,
            ScoringConfig {
                threshold: config.similarity_threshold,
                top_k: config.scoring_top_k,
            },
        );

        Ok(Self {
            repo,
            embedder,
            matcher,
            scorer,
            suggestion_top_k: config.suggestion_top_k,
            suggestion_sample_chars: config.suggestion_sample_chars,
        })
    }

    /// Run the full callback pipeline.
    ///
    /// The text update is committed before scoring starts, so a scoring
    /// failure leaves the text stored without an analysis row.
    #[instrument(skip(self, request), fields(assignment_id = request.assignment_id))]
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalysisOutcome> {
        let start = Instant::now();

        let assignment = self
            .repo
            .find_assignment_by_id(request.assignment_id)
            .await?
            .ok_or(AppError::AssignmentNotFound {
                id: request.assignment_id,
            })?;

        let assignment = self
            .repo
            .update_assignment_text(assignment, request.extracted_text, request.word_count)
            .await?;
        let text = assignment.original_text.as_deref().unwrap_or_default();

        let report = self.scorer.score(text).await?;
        let suggestions = self.suggest_sources(text).await?;

        let result = self
            .repo
            .create_analysis_result(
                assignment.id,
                &suggestions,
                report.plagiarism_score,
                &report.flagged_sections,
            )
            .await?;

        metrics::record_analysis(start.elapsed().as_secs_f64(), report.plagiarism_score);

        info!(
            analysis_id = result.id,
            plagiarism_score = report.plagiarism_score,
            chunks = report.chunks_count,
            flagged = report.flagged_sections.len(),
            "Analysis stored"
        );

        Ok(AnalysisOutcome {
            analysis_id: result.id,
            plagiarism_score: report.plagiarism_score,
            chunks_count: report.chunks_count,
            flagged_count: report.flagged_sections.len(),
        })
    }

    /// Nearest sources to the leading part of the document
    async fn suggest_sources(&self, text: &str) -> Result<Vec<SuggestedSource>> {
        let sample = sample(text, self.suggestion_sample_chars);
        if sample.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(sample).await?;
        let matches = self.matcher.nearest(&embedding, self.suggestion_top_k).await?;

        Ok(matches.into_iter().map(SuggestedSource::from).collect())
    }

    /// Assignment with every stored analysis
    pub async fn assignment_detail(&self, assignment_id: i32) -> Result<AssignmentDetail> {
        let assignment = self
            .repo
            .find_assignment_by_id(assignment_id)
            .await?
            .ok_or(AppError::AssignmentNotFound { id: assignment_id })?;

        let analyses = self
            .repo
            .list_analysis_results(assignment_id)
            .await?
            .into_iter()
            .map(AnalysisView::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(AssignmentDetail { assignment, analyses })
    }
}
