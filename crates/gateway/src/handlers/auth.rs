//! Student registration and login

use axum::{extract::State, Json};
use sea_orm::SqlErr;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use acadhelper_common::{
    auth::{hash_password, verify_password},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 256))]
    pub password: String,

    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: i32,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Create a student account
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    request.validate()?;

    if state.repo.find_student_by_email(&request.email).await?.is_some() {
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = hash_password(&request.password)?;

    // A concurrent registration can still win the unique index
    let student = match state
        .repo
        .create_student(request.email, password_hash, request.full_name)
        .await
    {
        Err(AppError::Database(err))
            if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
        {
            return Err(AppError::DuplicateEmail);
        }
        other => other?,
    };

    tracing::info!(user_id = student.id, "Student registered");

    Ok(Json(RegisterResponse {
        message: "Registration successful".to_string(),
        user_id: student.id,
    }))
}

/// Exchange credentials for an access token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    request.validate().map_err(|_| AppError::InvalidCredentials)?;

    let student = state
        .repo
        .find_student_by_email(&request.email)
        .await?
        .filter(|s| verify_password(&request.password, &s.password_hash))
        .ok_or(AppError::InvalidCredentials)?;

    let access_token = state.jwt.generate_token(&student.email)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
