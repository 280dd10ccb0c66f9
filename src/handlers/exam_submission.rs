// src/handlers/exam_submission.rs

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam_submission::{SubmitExamRequest, UpdateSubmissionRequest},
        pagination::{Page, PageParams},
    },
    services::submissions::{self, NewSubmission},
    utils::{
        extract::{AppJson, AppPath, AppQuery},
        jwt::Claims,
    },
};

/// Submits an exam attempt for the signed-in user.
///
/// * Scores every answer against the group's correct options.
/// * Stores the submission and its answers in one transaction.
/// * Returns the summary plus a per-answer review.
pub async fn create_submission(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question_group_id = req
        .question_group_id
        .ok_or_else(|| AppError::BadRequest("questionGroupId is required".to_string()))?;
    let answers = req
        .answers
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("answers are required".to_string()))?;
    req.validate()?;

    let result = submissions::submit_exam(
        &pool,
        NewSubmission {
            user_id: claims.user_id()?,
            question_group_id,
            completed_timeframe: &req.completed_timeframe,
            answers,
            claimed_score: req.total_score,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": result,
        })),
    ))
}

/// Lists submissions, most recent first. Admin only.
pub async fn list_submissions(
    State(pool): State<SqlitePool>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let (data, pagination) = submissions::list_submissions(&pool, Page::from(params)).await?;

    Ok(Json(json!({
        "success": true,
        "data": data,
        "pagination": pagination,
    })))
}

/// A single submission with its answers. Admin only.
pub async fn get_submission(
    State(pool): State<SqlitePool>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let submission = submissions::get_submission(&pool, id).await?;

    Ok(Json(json!({
        "success": true,
        "data": submission,
    })))
}

/// Corrects score and/or timeframe. Admin only.
pub async fn update_submission(
    State(pool): State<SqlitePool>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    submissions::update_submission(
        &pool,
        id,
        payload.total_score,
        payload.completed_timeframe.as_deref(),
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Exam submission updated successfully",
    })))
}

/// Deletes a submission and its answers. Admin only.
pub async fn delete_submission(
    State(pool): State<SqlitePool>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    submissions::delete_submission(&pool, id).await?;
    tracing::info!(submission_id = id, "Exam submission deleted");

    Ok(Json(json!({
        "success": true,
        "message": "Exam submission deleted successfully",
    })))
}
