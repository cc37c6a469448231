//! Plagiarism scoring
//!
//! Chunk the document, embed each chunk, look up its nearest corpus sources
//! and aggregate. Chunks are processed one after another; the first failing
//! embedding or lookup aborts the whole run.

use crate::chunker::{chunk_text, ChunkingConfig};
use crate::matcher::{SimilarityMatcher, SourceMatch};
use acadhelper_common::db::models::FlaggedSection;
use acadhelper_common::errors::Result;
use acadhelper_common::metrics;
use acadhelper_common::Embedder;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Characters of chunk text kept in a flagged entry
pub const SNIPPET_CHARS: usize = 400;

/// Scoring parameters
#[derive(Debug, Clone, Copy)]
pub struct ScoringConfig {
    /// Best-match similarity at or above which a chunk is flagged
    pub threshold: f64,
    /// Sources fetched per chunk
    pub top_k: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            threshold: 0.80,
            top_k: 3,
        }
    }
}

/// Outcome of one scoring run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    /// Mean of per-chunk best similarities, within [0, 1]
    pub plagiarism_score: f64,
    /// Flagged chunks in ascending chunk order
    pub flagged_sections: Vec<FlaggedSection>,
    pub chunks_count: usize,
}

impl ScoreReport {
    fn empty() -> Self {
        Self {
            plagiarism_score: 0.0,
            flagged_sections: Vec::new(),
            chunks_count: 0,
        }
    }
}

/// Highest-similarity match; the earliest wins a tie
///
/// Matches with a non-finite similarity never win.
pub fn best_match(matches: &[SourceMatch]) -> Option<&SourceMatch> {
    matches
        .iter()
        .filter(|m| m.similarity.is_finite())
        .fold(None, |best: Option<&SourceMatch>, m| match best {
            Some(b) if b.similarity >= m.similarity => Some(b),
            _ => Some(m),
        })
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

pub struct PlagiarismScorer {
    embedder: Arc<dyn Embedder>,
    matcher: Arc<dyn SimilarityMatcher>,
    chunking: ChunkingConfig,
    config: ScoringConfig,
}

impl PlagiarismScorer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        matcher: Arc<dyn SimilarityMatcher>,
        chunking: ChunkingConfig,
        config: ScoringConfig,
    ) -> Self {
        Self {
            embedder,
            matcher,
            chunking,
            config,
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn score(&self, text: &str) -> Result<ScoreReport> {
        let chunks = chunk_text(text, &self.chunking);
        if chunks.is_empty() {
            return Ok(ScoreReport::empty());
        }

        let mut flagged_sections = Vec::new();
        let mut total = 0.0;

        for chunk in &chunks {
            let embedding = self.embedder.embed(&chunk.content).await?;
            let matches = self.matcher.nearest(&embedding, self.config.top_k).await?;

            let best = best_match(&matches);
            // Negative cosine similarity counts as no overlap
            let best_similarity = best
                .map(|m| m.similarity)
                .filter(|s| s.is_finite())
                .map_or(0.0, |s| s.clamp(0.0, 1.0));

            debug!(
                chunk_index = chunk.index,
                matches = matches.len(),
                best_similarity,
                "Chunk scored"
            );

            if best_similarity >= self.config.threshold {
                flagged_sections.push(FlaggedSection {
                    chunk_index: chunk.index,
                    chunk_text_snippet: snippet(&chunk.content),
                    similarity: best_similarity,
                    source_id: best.map(|m| m.source_id),
                    source_title: best.map(|m| m.title.clone()),
                });
            }

            total += best_similarity;
        }

        let chunks_count = chunks.len();
        metrics::record_scoring(chunks_count, flagged_sections.len());

        Ok(ScoreReport {
            plagiarism_score: total / chunks_count as f64,
            flagged_sections,
            chunks_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acadhelper_common::errors::AppError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Embeds a chunk as `[position of its first token in the script]`
    struct ScriptedEmbedder {
        order: Vec<&'static str>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl Embedder for ScriptedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let first = text.split_whitespace().next().unwrap_or_default();
            if Some(first) == self.fail_on {
                return Err(AppError::EmbeddingError { message: "boom".into() });
            }
            let pos = self.order.iter().position(|t| *t == first).unwrap_or(usize::MAX);
            Ok(vec![pos as f32])
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        fn dimension(&self) -> usize {
            1
        }
    }

    /// Returns canned matches keyed by the embedding's single component
    struct CannedMatcher {
        by_key: HashMap<u32, Vec<SourceMatch>>,
    }

    #[async_trait]
    impl SimilarityMatcher for CannedMatcher {
        async fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<SourceMatch>> {
            let mut found = self.by_key.get(&(embedding[0] as u32)).cloned().unwrap_or_default();
            found.truncate(k);
            Ok(found)
        }
    }

    fn source(id: i32, similarity: f64) -> SourceMatch {
        SourceMatch {
            source_id: id,
            title: format!("Source {id}"),
            authors: None,
            publication_year: None,
            similarity,
        }
    }

    fn scorer(
        embedder: ScriptedEmbedder,
        by_key: HashMap<u32, Vec<SourceMatch>>,
        chunking: ChunkingConfig,
    ) -> PlagiarismScorer {
        PlagiarismScorer::new(
            Arc::new(embedder),
            Arc::new(CannedMatcher { by_key }),
            chunking,
            ScoringConfig::default(),
        )
    }

    fn embedder(order: Vec<&'static str>) -> ScriptedEmbedder {
        ScriptedEmbedder { order, fail_on: None }
    }

    #[tokio::test]
    async fn test_empty_text_scores_zero() {
        let scorer = scorer(embedder(vec![]), HashMap::new(), ChunkingConfig::default());
        let report = scorer.score("   ").await.unwrap();
        assert_eq!(report, ScoreReport::empty());
    }

    #[tokio::test]
    async fn test_single_source_above_threshold_is_flagged() {
        let by_key = HashMap::from([(0, vec![source(17, 0.92)])]);
        let scorer = scorer(embedder(vec!["alpha"]), by_key, ChunkingConfig::default());

        let report = scorer.score("alpha beta gamma").await.unwrap();

        assert_eq!(report.chunks_count, 1);
        assert_eq!(report.flagged_sections.len(), 1);
        let flagged = &report.flagged_sections[0];
        assert_eq!(flagged.chunk_index, 0);
        assert_eq!(flagged.similarity, 0.92);
        assert_eq!(flagged.source_id, Some(17));
        assert_eq!(flagged.source_title.as_deref(), Some("Source 17"));
        assert_eq!(flagged.chunk_text_snippet, "alpha beta gamma");
        assert!((report.plagiarism_score - 0.92).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_mean_of_best_similarities_and_flag_order() {
        // "a b c d e f g h" with size 4 / overlap 1 -> chunks start at a, d, g
        let by_key = HashMap::from([
            (0, vec![source(1, 0.40), source(2, 0.85)]),
            (1, vec![]),
            (2, vec![source(3, 0.80)]),
        ]);
        let scorer = scorer(
            embedder(vec!["a", "d", "g"]),
            by_key,
            ChunkingConfig::new(4, 1).unwrap(),
        );

        let report = scorer.score("a b c d e f g h").await.unwrap();

        assert_eq!(report.chunks_count, 3);
        let expected = (0.85 + 0.0 + 0.80) / 3.0;
        assert!((report.plagiarism_score - expected).abs() < 1e-12);

        let indices: Vec<_> = report.flagged_sections.iter().map(|f| f.chunk_index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(report.flagged_sections[0].source_id, Some(2));
        // Exactly at the threshold still flags
        assert_eq!(report.flagged_sections[1].similarity, 0.80);
    }

    #[tokio::test]
    async fn test_below_threshold_not_flagged() {
        let by_key = HashMap::from([(0, vec![source(5, 0.7999)])]);
        let scorer = scorer(embedder(vec!["x"]), by_key, ChunkingConfig::default());

        let report = scorer.score("x y").await.unwrap();
        assert!(report.flagged_sections.is_empty());
        assert!((report.plagiarism_score - 0.7999).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_score_stays_within_unit_range() {
        let by_key = HashMap::from([(0, vec![source(1, -0.3)]), (1, vec![source(2, 1.0)])]);
        let scorer = scorer(
            embedder(vec!["p", "q"]),
            by_key,
            ChunkingConfig::new(1, 0).unwrap(),
        );

        let report = scorer.score("p q").await.unwrap();
        assert!((0.0..=1.0).contains(&report.plagiarism_score));
        assert!((report.plagiarism_score - 0.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_nan_similarity_counts_as_no_overlap() {
        let by_key = HashMap::from([
            (0, vec![source(1, f64::NAN)]),
            (1, vec![source(2, f64::NAN), source(3, 0.85)]),
        ]);
        let scorer = scorer(
            embedder(vec!["p", "q"]),
            by_key,
            ChunkingConfig::new(1, 0).unwrap(),
        );

        let report = scorer.score("p q").await.unwrap();

        assert!((0.0..=1.0).contains(&report.plagiarism_score));
        assert!((report.plagiarism_score - 0.425).abs() < 1e-12);
        assert_eq!(report.flagged_sections.len(), 1);
        assert_eq!(report.flagged_sections[0].chunk_index, 1);
        assert_eq!(report.flagged_sections[0].source_id, Some(3));

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["plagiarism_score"].is_number());
    }

    #[tokio::test]
    async fn test_only_nan_matches_score_zero() {
        let by_key = HashMap::from([(0, vec![source(1, f64::NAN)])]);
        let scorer = scorer(embedder(vec!["z"]), by_key, ChunkingConfig::default());

        let report = scorer.score("z z z").await.unwrap();

        assert_eq!(report.plagiarism_score, 0.0);
        assert!(report.flagged_sections.is_empty());
        assert_eq!(report.chunks_count, 1);
    }

    #[tokio::test]
    async fn test_snippet_is_bounded() {
        let long_word = "z".repeat(1000);
        let by_key = HashMap::from([(u32::MAX, vec![source(1, 0.99)])]);
        let scorer = scorer(embedder(vec![]), by_key, ChunkingConfig::default());

        let report = scorer.score(&long_word).await.unwrap();
        assert_eq!(report.flagged_sections[0].chunk_text_snippet.chars().count(), SNIPPET_CHARS);
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts_run() {
        let failing = ScriptedEmbedder {
            order: vec!["a", "d", "g"],
            fail_on: Some("d"),
        };
        let scorer = PlagiarismScorer::new(
            Arc::new(failing),
            Arc::new(CannedMatcher { by_key: HashMap::new() }),
            ChunkingConfig::new(4, 1).unwrap(),
            ScoringConfig::default(),
        );

        let err = scorer.score("a b c d e f g h").await.unwrap_err();
        assert!(matches!(err, AppError::EmbeddingError { .. }));
    }

    #[test]
    fn test_best_match_prefers_first_on_tie() {
        let matches = vec![source(1, 0.5), source(2, 0.9), source(3, 0.9)];
        assert_eq!(best_match(&matches).map(|m| m.source_id), Some(2));
        assert!(best_match(&[]).is_none());
        assert!(best_match(&[source(4, f64::NAN)]).is_none());
    }
}
