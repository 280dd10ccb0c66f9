// src/handlers/question.rs

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{
        CreateQuestionsRequest, GroupWithQuestions, PublicQuestion, QuestionListParams,
        UpdateQuestionRequest,
    },
    services::catalog::{self, QuestionUpdate},
    utils::{
        extract::{AppJson, AppPath, AppQuery},
        jwt::Claims,
    },
};

/// Returns one random group with its questions, for a mock test.
///
/// Exam takers receive the public view without correctness flags.
pub async fn get_random_group(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let group = catalog::random_group(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("No groups found".to_string()))?;

    let mut conn = pool.acquire().await?;
    let questions = catalog::list_questions(&mut conn, Some(group.id)).await?;

    let response = if claims.role.is_admin() {
        Json(GroupWithQuestions { group, questions }).into_response()
    } else {
        let questions: Vec<PublicQuestion> =
            questions.into_iter().map(PublicQuestion::from).collect();
        Json(GroupWithQuestions { group, questions }).into_response()
    };

    Ok(response)
}

/// Creates several questions, with their options, under one group.
pub async fn create_questions(
    State(pool): State<SqlitePool>,
    AppJson(payload): AppJson<CreateQuestionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let group_id = payload
        .group_id
        .ok_or_else(|| AppError::BadRequest("Group ID is required".to_string()))?;
    payload.validate()?;

    let created = catalog::create_questions(&pool, group_id, &payload.questions).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("{} questions created successfully", created.len()),
            "data": created,
        })),
    ))
}

/// Lists questions with options, optionally restricted to `?groupId=`.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    AppQuery(params): AppQuery<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let questions = catalog::list_questions(&mut conn, params.group_id).await?;
    Ok(Json(questions))
}

pub async fn get_question(
    State(pool): State<SqlitePool>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;
    Ok(Json(catalog::get_question(&mut conn, id).await?))
}

/// Updates a question. When `options` is sent, all previous options are replaced.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let group_id = payload
        .group_id
        .ok_or_else(|| AppError::BadRequest("Group ID is required".to_string()))?;
    payload.validate()?;

    let updated = catalog::update_question(
        &pool,
        id,
        QuestionUpdate {
            group_id,
            question: payload.question.as_deref(),
            description: payload.description.as_deref(),
            options: payload.options.as_deref(),
        },
    )
    .await?;

    Ok(Json(updated))
}

pub async fn delete_question(
    State(pool): State<SqlitePool>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    catalog::delete_question(&pool, id).await?;
    tracing::info!(question_id = id, "Question deleted");

    Ok(Json(json!({ "message": "Question deleted successfully" })))
}
