// src/services/submissions.rs

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    error::AppError,
    models::{
        exam_submission::{
            AnswerDetail, ExamSubmission, ExamSubmissionAnswer, SubmissionDetail,
            SubmissionListItem, SubmissionResult, SubmittedAnswer,
        },
        pagination::{Page, Pagination},
        question::{GroupRef, QuestionWithOptions},
        user::UserSummary,
    },
    services::{catalog, scoring},
};

/// An exam attempt as received from the client.
pub struct NewSubmission<'a> {
    pub user_id: i64,
    pub question_group_id: i64,
    pub completed_timeframe: &'a str,
    pub answers: &'a [SubmittedAnswer],
    /// Score reported by the client; checked against the computed one.
    pub claimed_score: Option<i64>,
}

/// Scores an attempt and stores it with its answers in a single transaction.
///
/// Nothing is written unless every answer resolves against the group.
pub async fn submit_exam(
    pool: &SqlitePool,
    submission: NewSubmission<'_>,
) -> Result<SubmissionResult, AppError> {
    let mut tx = pool.begin().await?;

    if !catalog::group_exists(&mut tx, submission.question_group_id).await? {
        return Err(AppError::NotFound("Question Group not found".to_string()));
    }

    let questions =
        catalog::list_questions(&mut tx, Some(submission.question_group_id)).await?;
    let evaluation = scoring::evaluate(&questions, submission.answers)?;

    if let Some(claimed) = submission.claimed_score {
        if claimed != evaluation.correct_count {
            tracing::warn!(
                user_id = submission.user_id,
                claimed,
                computed = evaluation.correct_count,
                "Client-reported score differs from computed score; storing computed score"
            );
        }
    }

    let submission_id = record_submission(
        &mut tx,
        submission.user_id,
        submission.question_group_id,
        evaluation.correct_count,
        submission.completed_timeframe,
        submission.answers,
    )
    .await
    .map_err(|e| {
        tracing::error!("Failed to record exam submission: {:?}", e);
        AppError::from(e)
    })?;

    tx.commit().await?;

    tracing::info!(
        submission_id,
        user_id = submission.user_id,
        question_group_id = submission.question_group_id,
        score = evaluation.correct_count,
        "Exam submitted"
    );

    Ok(SubmissionResult {
        submission_id,
        summary: scoring::summarize(
            questions.len(),
            evaluation.correct_count,
            submission.completed_timeframe,
        ),
        review: evaluation.review,
    })
}

/// Inserts the submission row, then all answer rows. Returns the submission id.
///
/// Callers run this inside a transaction; a failed answer insert leaves the
/// submission row to be rolled back with it.
pub async fn record_submission(
    conn: &mut SqliteConnection,
    user_id: i64,
    question_group_id: i64,
    total_score: i64,
    completed_timeframe: &str,
    answers: &[SubmittedAnswer],
) -> Result<i64, sqlx::Error> {
    let submission_id: i64 = sqlx::query_scalar(
        "INSERT INTO exam_submissions
            (user_id, question_group_id, answered_at, total_score, completed_timeframe)
         VALUES (?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(user_id)
    .bind(question_group_id)
    .bind(chrono::Utc::now())
    .bind(total_score)
    .bind(completed_timeframe)
    .fetch_one(&mut *conn)
    .await?;

    if !answers.is_empty() {
        let mut query_builder = QueryBuilder::<Sqlite>::new(
            "INSERT INTO exam_submission_answers (exam_submission_id, question_id, selected_option) ",
        );
        query_builder.push_values(answers, |mut row, answer| {
            row.push_bind(submission_id)
                .push_bind(answer.question_id)
                .push_bind(answer.selected_option.clone());
        });
        query_builder.build().execute(&mut *conn).await?;
    }

    Ok(submission_id)
}

/// Helper row for a submission joined with its group title and user.
#[derive(sqlx::FromRow)]
struct SubmissionRow {
    #[sqlx(flatten)]
    submission: ExamSubmission,
    group_title: Option<String>,
    user_name: Option<String>,
    user_email: Option<String>,
}

impl SubmissionRow {
    fn into_parts(self) -> (ExamSubmission, Option<GroupRef>, Option<UserSummary>) {
        let group = self.group_title.map(|title| GroupRef {
            id: self.submission.question_group_id,
            title,
        });
        let user = match (self.user_name, self.user_email) {
            (Some(name), Some(email)) => Some(UserSummary {
                id: self.submission.user_id,
                name,
                email,
            }),
            _ => None,
        };
        (self.submission, group, user)
    }
}

const SUBMISSION_SELECT: &str =
    "SELECT s.id, s.user_id, s.question_group_id, s.answered_at, s.total_score, s.completed_timeframe,
            g.title AS group_title, u.name AS user_name, u.email AS user_email
     FROM exam_submissions s
     LEFT JOIN question_groups g ON g.id = s.question_group_id
     LEFT JOIN users u ON u.id = s.user_id";

/// One page of submissions, most recent first.
pub async fn list_submissions(
    pool: &SqlitePool,
    page: Page,
) -> Result<(Vec<SubmissionListItem>, Pagination), AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exam_submissions")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
        "{SUBMISSION_SELECT} ORDER BY s.answered_at DESC, s.id DESC LIMIT ? OFFSET ?"
    ))
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| {
            let (submission, question_group, user) = row.into_parts();
            SubmissionListItem {
                submission,
                question_group,
                user,
            }
        })
        .collect();

    Ok((items, page.result(total)))
}

/// A submission with its answers, each carrying its question and options.
pub async fn get_submission(pool: &SqlitePool, id: i64) -> Result<SubmissionDetail, AppError> {
    let mut conn = pool.acquire().await?;

    let row = sqlx::query_as::<_, SubmissionRow>(&format!("{SUBMISSION_SELECT} WHERE s.id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam submission not found".to_string()))?;

    let answers = sqlx::query_as::<_, ExamSubmissionAnswer>(
        "SELECT id, exam_submission_id, question_id, selected_option
         FROM exam_submission_answers
         WHERE exam_submission_id = ?
         ORDER BY id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let mut question_ids: Vec<i64> = answers.iter().map(|a| a.question_id).collect();
    question_ids.sort_unstable();
    question_ids.dedup();

    let questions: HashMap<i64, QuestionWithOptions> =
        catalog::questions_by_ids(&mut conn, &question_ids)
            .await?
            .into_iter()
            .map(|q| (q.question.id, q))
            .collect();

    let answers = answers
        .into_iter()
        .map(|answer| AnswerDetail {
            question: questions.get(&answer.question_id).cloned(),
            answer,
        })
        .collect();

    let (submission, question_group, user) = row.into_parts();
    Ok(SubmissionDetail {
        submission,
        question_group,
        user,
        answers,
    })
}

/// Administrative correction of score and/or timeframe. Last write wins.
pub async fn update_submission(
    pool: &SqlitePool,
    id: i64,
    total_score: Option<i64>,
    completed_timeframe: Option<&str>,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE exam_submissions
         SET total_score = COALESCE(?, total_score),
             completed_timeframe = COALESCE(?, completed_timeframe)
         WHERE id = ?",
    )
    .bind(total_score)
    .bind(completed_timeframe)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam submission not found".to_string()));
    }
    Ok(())
}

/// Deletes a submission and its answers together.
pub async fn delete_submission(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM exam_submission_answers WHERE exam_submission_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM exam_submissions WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam submission not found".to_string()));
    }

    tx.commit().await?;
    Ok(())
}
