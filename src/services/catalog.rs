// src/services/catalog.rs

//! Question groups, questions and options.
//!
//! Cascades are done here rather than by the database: deleting a group removes
//! its questions and their options, and a question's options are always
//! replaced as a whole.

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        question::{
            GroupWithCreator, NewOption, NewQuestion, Question, QuestionGroup, QuestionOption,
            QuestionWithOptions,
        },
        user::UserSummary,
    },
    utils::html::clean_html,
};

const GROUP_COLUMNS: &str = "id, title, description, created_by, created_at, updated_at";
const QUESTION_COLUMNS: &str = "id, group_id, question, description, created_at, updated_at";

/// Helper row for groups joined with their author.
#[derive(sqlx::FromRow)]
struct GroupCreatorRow {
    #[sqlx(flatten)]
    group: QuestionGroup,
    creator_name: Option<String>,
    creator_email: Option<String>,
}

impl From<GroupCreatorRow> for GroupWithCreator {
    fn from(row: GroupCreatorRow) -> Self {
        let creator = match (row.creator_name, row.creator_email) {
            (Some(name), Some(email)) => Some(UserSummary {
                id: row.group.created_by,
                name,
                email,
            }),
            _ => None,
        };
        Self {
            group: row.group,
            creator,
        }
    }
}

fn group_title_conflict(title: &str) -> AppError {
    AppError::Conflict(format!("Question Group '{}' already exists", title))
}

pub async fn create_group(
    pool: &SqlitePool,
    title: &str,
    description: Option<&str>,
    created_by: i64,
) -> Result<QuestionGroup, AppError> {
    let title = clean_html(title.trim());
    let description = clean_html(description.unwrap_or_default());
    let now = chrono::Utc::now();

    sqlx::query_as::<_, QuestionGroup>(&format!(
        "INSERT INTO question_groups (title, description, created_by, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)
         RETURNING {GROUP_COLUMNS}"
    ))
    .bind(&title)
    .bind(&description)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            group_title_conflict(&title)
        } else {
            tracing::error!("Failed to create question group: {:?}", e);
            AppError::from(e)
        }
    })
}

/// All groups with their creators, newest first.
pub async fn list_groups(pool: &SqlitePool) -> Result<Vec<GroupWithCreator>, AppError> {
    let rows = sqlx::query_as::<_, GroupCreatorRow>(
        "SELECT g.id, g.title, g.description, g.created_by, g.created_at, g.updated_at,
                u.name AS creator_name, u.email AS creator_email
         FROM question_groups g
         LEFT JOIN users u ON u.id = g.created_by
         ORDER BY g.created_at DESC, g.id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(GroupWithCreator::from).collect())
}

pub async fn get_group(pool: &SqlitePool, id: i64) -> Result<GroupWithCreator, AppError> {
    sqlx::query_as::<_, GroupCreatorRow>(
        "SELECT g.id, g.title, g.description, g.created_by, g.created_at, g.updated_at,
                u.name AS creator_name, u.email AS creator_email
         FROM question_groups g
         LEFT JOIN users u ON u.id = g.created_by
         WHERE g.id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .map(GroupWithCreator::from)
    .ok_or_else(|| AppError::NotFound("Question Group not found".to_string()))
}

pub async fn group_exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM question_groups WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Updates title and/or description; absent fields keep their value.
pub async fn update_group(
    pool: &SqlitePool,
    id: i64,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<QuestionGroup, AppError> {
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(clean_html);
    let description = description.map(clean_html);

    sqlx::query_as::<_, QuestionGroup>(&format!(
        "UPDATE question_groups
         SET title = COALESCE(?, title),
             description = COALESCE(?, description),
             updated_at = ?
         WHERE id = ?
         RETURNING {GROUP_COLUMNS}"
    ))
    .bind(title.as_deref())
    .bind(description.as_deref())
    .bind(chrono::Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            group_title_conflict(title.as_deref().unwrap_or_default())
        } else {
            tracing::error!("Failed to update question group: {:?}", e);
            AppError::from(e)
        }
    })?
    .ok_or_else(|| AppError::NotFound("Question Group not found".to_string()))
}

/// Deletes a group together with its questions and their options.
///
/// Groups that already have submissions are kept, since submissions must stay resolvable.
pub async fn delete_group(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    if !group_exists(&mut tx, id).await? {
        return Err(AppError::NotFound("Question Group not found".to_string()));
    }

    let submissions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM exam_submissions WHERE question_group_id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
    if submissions > 0 {
        return Err(AppError::Conflict(
            "Question Group has exam submissions and cannot be deleted".to_string(),
        ));
    }

    sqlx::query(
        "DELETE FROM options WHERE question_id IN (SELECT id FROM questions WHERE group_id = ?)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM questions WHERE group_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM question_groups WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// A uniformly chosen group id, if any group exists.
pub async fn random_group(pool: &SqlitePool) -> Result<Option<QuestionGroup>, AppError> {
    let group = sqlx::query_as::<_, QuestionGroup>(&format!(
        "SELECT {GROUP_COLUMNS} FROM question_groups ORDER BY RANDOM() LIMIT 1"
    ))
    .fetch_optional(pool)
    .await?;
    Ok(group)
}

/// Groups options under their questions, preserving question order.
fn attach_options(
    questions: Vec<Question>,
    options: Vec<QuestionOption>,
) -> Vec<QuestionWithOptions> {
    let mut by_question: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    questions
        .into_iter()
        .map(|question| {
            let options = by_question.remove(&question.id).unwrap_or_default();
            QuestionWithOptions { question, options }
        })
        .collect()
}

/// Questions (with options) of one group, or of every group when `group_id` is `None`.
pub async fn list_questions(
    conn: &mut SqliteConnection,
    group_id: Option<i64>,
) -> Result<Vec<QuestionWithOptions>, sqlx::Error> {
    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions
         WHERE (?1 IS NULL OR group_id = ?1)
         ORDER BY id"
    ))
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await?;

    let options = sqlx::query_as::<_, QuestionOption>(
        "SELECT o.id, o.question_id, o.text, o.is_correct
         FROM options o
         JOIN questions q ON q.id = o.question_id
         WHERE (?1 IS NULL OR q.group_id = ?1)
         ORDER BY o.id",
    )
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(attach_options(questions, options))
}

/// Questions (with options) for the given ids, in id order. Unknown ids are skipped.
pub async fn questions_by_ids(
    conn: &mut SqliteConnection,
    ids: &[i64],
) -> Result<Vec<QuestionWithOptions>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query_builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id IN ("
    ));
    let mut separated = query_builder.separated(",");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY id");
    let questions: Vec<Question> = query_builder
        .build_query_as()
        .fetch_all(&mut *conn)
        .await?;

    let mut query_builder = QueryBuilder::<Sqlite>::new(
        "SELECT id, question_id, text, is_correct FROM options WHERE question_id IN (",
    );
    let mut separated = query_builder.separated(",");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY id");
    let options: Vec<QuestionOption> = query_builder
        .build_query_as()
        .fetch_all(&mut *conn)
        .await?;

    Ok(attach_options(questions, options))
}

pub async fn get_question(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<QuestionWithOptions, AppError> {
    questions_by_ids(conn, &[id])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))
}

async fn insert_options(
    conn: &mut SqliteConnection,
    question_id: i64,
    options: &[NewOption],
) -> Result<(), sqlx::Error> {
    if options.is_empty() {
        return Ok(());
    }

    let mut query_builder =
        QueryBuilder::<Sqlite>::new("INSERT INTO options (question_id, text, is_correct) ");
    query_builder.push_values(options, |mut row, option| {
        row.push_bind(question_id)
            .push_bind(clean_html(&option.text))
            .push_bind(option.is_correct);
    });
    query_builder.build().execute(&mut *conn).await?;
    Ok(())
}

/// Creates every question of `questions` under `group_id` in one transaction.
pub async fn create_questions(
    pool: &SqlitePool,
    group_id: i64,
    questions: &[NewQuestion],
) -> Result<Vec<QuestionWithOptions>, AppError> {
    let mut tx = pool.begin().await?;

    if !group_exists(&mut tx, group_id).await? {
        return Err(AppError::NotFound("Question Group not found".to_string()));
    }

    let now = chrono::Utc::now();
    let mut created_ids = Vec::with_capacity(questions.len());
    for new_question in questions {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO questions (group_id, question, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(group_id)
        .bind(clean_html(&new_question.question))
        .bind(new_question.description.as_deref().map(clean_html))
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        insert_options(&mut tx, id, &new_question.options).await?;
        created_ids.push(id);
    }

    let created = questions_by_ids(&mut tx, &created_ids).await?;
    tx.commit().await?;

    tracing::info!(group_id, count = created.len(), "Questions created");
    Ok(created)
}

/// Fields of a question update. `options`, when present, replaces all options.
pub struct QuestionUpdate<'a> {
    pub group_id: i64,
    pub question: Option<&'a str>,
    pub description: Option<&'a str>,
    pub options: Option<&'a [NewOption]>,
}

pub async fn update_question(
    pool: &SqlitePool,
    id: i64,
    update: QuestionUpdate<'_>,
) -> Result<QuestionWithOptions, AppError> {
    let mut tx = pool.begin().await?;

    if !group_exists(&mut tx, update.group_id).await? {
        return Err(AppError::NotFound("Question Group not found".to_string()));
    }

    let result = sqlx::query(
        "UPDATE questions
         SET group_id = ?,
             question = COALESCE(?, question),
             description = COALESCE(?, description),
             updated_at = ?
         WHERE id = ?",
    )
    .bind(update.group_id)
    .bind(update.question.map(clean_html))
    .bind(update.description.map(clean_html))
    .bind(chrono::Utc::now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    if let Some(options) = update.options {
        sqlx::query("DELETE FROM options WHERE question_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_options(&mut tx, id, options).await?;
    }

    let updated = get_question(&mut tx, id).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Deletes a question and its options. Answered questions are kept.
pub async fn delete_question(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let answers: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM exam_submission_answers WHERE question_id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
    if answers > 0 {
        return Err(AppError::Conflict(
            "Question has recorded answers and cannot be deleted".to_string(),
        ));
    }

    sqlx::query("DELETE FROM options WHERE question_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_options_keeps_question_order() {
        let now = chrono::Utc::now();
        let question = |id| Question {
            id,
            group_id: 1,
            question: format!("Q{}", id),
            description: None,
            created_at: now,
            updated_at: now,
        };
        let option = |id, question_id| QuestionOption {
            id,
            question_id,
            text: format!("O{}", id),
            is_correct: false,
        };

        let grouped = attach_options(
            vec![question(2), question(1), question(3)],
            vec![option(10, 1), option(11, 2), option(12, 1)],
        );

        assert_eq!(grouped.iter().map(|q| q.question.id).collect::<Vec<_>>(), vec![2, 1, 3]);
        assert_eq!(grouped[1].options.iter().map(|o| o.id).collect::<Vec<_>>(), vec![10, 12]);
        assert!(grouped[2].options.is_empty());
    }
}
