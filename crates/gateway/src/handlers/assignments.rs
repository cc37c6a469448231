//! Assignment upload and lookup handlers

use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    Json,
};
use serde::Serialize;
use std::path::Path as FsPath;
use uuid::Uuid;

use crate::workflow::UploadEvent;
use crate::AppState;
use acadhelper_analysis::AssignmentDetail;
use acadhelper_common::{
    db::NewAssignment,
    errors::{AppError, Result},
    metrics,
};

const DEFAULT_TOPIC: &str = "Unknown";
const DEFAULT_ACADEMIC_LEVEL: &str = "Undergraduate";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub assignment_id: i32,
}

/// Parsed multipart form
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    topic: Option<String>,
    academic_level: Option<String>,
    student_id: Option<String>,
}

fn multipart_error(err: impl std::fmt::Display) -> AppError {
    AppError::InvalidFormat {
        message: format!("Malformed multipart body: {}", err),
    }
}

async fn field_text(field: Field<'_>) -> Result<String> {
    field.text().await.map_err(multipart_error)
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let original = field.file_name().unwrap_or("upload").to_string();
                    let data = field.bytes().await.map_err(multipart_error)?;
                    form.file = Some((original, data.to_vec()));
                }
                "topic" => form.topic = Some(field_text(field).await?),
                "academic_level" => form.academic_level = Some(field_text(field).await?),
                "student_id" => form.student_id = Some(field_text(field).await?),
                _ => {}
            }
        }

        Ok(form)
    }
}

/// Final path component of a client-supplied file name
fn sanitize_filename(original: &str) -> String {
    FsPath::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload")
        .to_string()
}

/// `{uuid}_{original}`, unique per upload
fn stored_filename(original: &str) -> String {
    format!("{}_{}", Uuid::new_v4(), sanitize_filename(original))
}

fn parse_student_id(raw: Option<String>) -> Result<i32> {
    let raw = raw.ok_or_else(|| AppError::MissingField {
        field: "student_id".to_string(),
    })?;

    raw.trim().parse().map_err(|_| AppError::Validation {
        message: format!("student_id must be an integer, got '{}'", raw),
        field: Some("student_id".to_string()),
    })
}

/// Store the upload, record the assignment and notify the workflow
pub async fn upload_assignment(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let form = UploadForm::read(multipart).await?;

    let (original, data) = form.file.ok_or_else(|| AppError::MissingField {
        field: "file".to_string(),
    })?;
    let student_id = parse_student_id(form.student_id)?;
    let topic = form.topic.unwrap_or_else(|| DEFAULT_TOPIC.to_string());
    let academic_level = form
        .academic_level
        .unwrap_or_else(|| DEFAULT_ACADEMIC_LEVEL.to_string());

    if state.repo.find_student_by_id(student_id).await?.is_none() {
        return Err(AppError::StudentNotFound { id: student_id });
    }

    let filename = stored_filename(&original);
    let upload_dir = FsPath::new(&state.config.storage.upload_dir);
    tokio::fs::create_dir_all(upload_dir).await?;
    let path = upload_dir.join(&filename);
    tokio::fs::write(&path, &data).await?;

    let created = state
        .repo
        .create_assignment(NewAssignment {
            student_id,
            filename: filename.clone(),
            topic: topic.clone(),
            academic_level,
        })
        .await;

    let assignment = match created {
        Ok(assignment) => assignment,
        Err(e) => {
            // No row references the stored file
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                tracing::warn!(
                    path = %path.display(),
                    error = %remove_err,
                    "Failed to remove orphaned upload"
                );
            }
            return Err(e);
        }
    };

    tracing::info!(
        assignment_id = assignment.id,
        student_id,
        bytes = data.len(),
        "Assignment uploaded"
    );

    let event = UploadEvent {
        assignment_id: assignment.id,
        filename: &filename,
        topic: &topic,
    };
    let notified = match state.workflow.notify(&event).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                assignment_id = assignment.id,
                webhook = state.workflow.webhook_url(),
                error = %e,
                "Failed to trigger extraction workflow"
            );
            false
        }
    };
    metrics::record_upload(notified);

    Ok(Json(UploadResponse {
        message: "Assignment uploaded successfully".to_string(),
        assignment_id: assignment.id,
    }))
}

/// Assignment with its analysis history
pub async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AssignmentDetail>> {
    let detail = state.analysis.assignment_detail(id).await?;
    Ok(Json(detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("essay.pdf"), "essay.pdf");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn test_stored_filename_prefix() {
        let name = stored_filename("essay.pdf");
        let (prefix, rest) = name.split_once('_').unwrap();
        assert!(Uuid::parse_str(prefix).is_ok());
        assert_eq!(rest, "essay.pdf");
    }

    #[test]
    fn test_parse_student_id() {
        assert_eq!(parse_student_id(Some(" 42 ".into())).unwrap(), 42);
        assert!(matches!(parse_student_id(None), Err(AppError::MissingField { .. })));
        assert!(matches!(
            parse_student_id(Some("abc".into())),
            Err(AppError::Validation { .. })
        ));
    }
}
