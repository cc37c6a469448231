//! Assignment Helper analysis pipeline
//!
//! - [`chunker`]: overlapping whitespace-token windows
//! - [`matcher`]: nearest corpus sources through pgvector
//! - [`scorer`]: per-chunk matching aggregated into a document score
//! - [`service`]: the analyze-callback flow and assignment history
//! - [`corpus`]: academic source upserts

pub mod chunker;
pub mod corpus;
pub mod matcher;
pub mod scorer;
pub mod service;

pub use chunker::{chunk_text, ChunkingConfig, ChunkingError, TextChunk};
pub use corpus::CorpusService;
pub use matcher::{PgVectorMatcher, SimilarityMatcher, SourceMatch};
pub use scorer::{PlagiarismScorer, ScoreReport, ScoringConfig};
pub use service::{AnalysisOutcome, AnalysisService, AnalyzeRequest, AssignmentDetail};

use acadhelper_common::AppError;

impl From<ChunkingError> for AppError {
    fn from(err: ChunkingError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
