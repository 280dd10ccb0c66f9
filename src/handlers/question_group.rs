// src/handlers/question_group.rs

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
    models::question::{CreateGroupRequest, UpdateGroupRequest},
    services::catalog,
    utils::{
        extract::{AppJson, AppPath},
        jwt::Claims,
    },
};

/// Creates a question group owned by the caller.
pub async fn create_group(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let group = catalog::create_group(
        &pool,
        &payload.title,
        payload.description.as_deref(),
        claims.user_id()?,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Question Group created successfully",
            "group": group,
        })),
    ))
}

pub async fn list_groups(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(catalog::list_groups(&pool).await?))
}

pub async fn get_group(
    State(pool): State<SqlitePool>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(catalog::get_group(&pool, id).await?))
}

/// Updates title and/or description. Blank titles keep the current one.
pub async fn update_group(
    State(pool): State<SqlitePool>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let group = catalog::update_group(
        &pool,
        id,
        payload.title.as_deref(),
        payload.description.as_deref(),
    )
    .await?;

    Ok(Json(json!({
        "message": "Question Group updated successfully",
        "group": group,
    })))
}

/// Deletes a group with all of its questions and options.
pub async fn delete_group(
    State(pool): State<SqlitePool>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    catalog::delete_group(&pool, id).await?;
    tracing::info!(group_id = id, "Question group deleted");

    Ok(Json(json!({ "message": "Question Group deleted successfully" })))
}
