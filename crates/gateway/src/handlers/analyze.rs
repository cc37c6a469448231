//! Extraction workflow callback

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use acadhelper_analysis::AnalyzeRequest;
use acadhelper_common::errors::Result;

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub message: String,
    pub analysis_id: i32,
    pub plagiarism_score: f64,
}

/// Score the extracted text and store the analysis
pub async fn callback(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>> {
    let outcome = state.analysis.analyze(request).await?;

    Ok(Json(AnalyzeResponse {
        message: "Analysis completed".to_string(),
        analysis_id: outcome.analysis_id,
        plagiarism_score: outcome.plagiarism_score,
    }))
}
