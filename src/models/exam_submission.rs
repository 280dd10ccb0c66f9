// src/models/exam_submission.rs

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{
    question::{GroupRef, QuestionWithOptions},
    user::UserSummary,
};

/// Represents the 'exam_submissions' table in the database.
/// One row per completed exam attempt.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSubmission {
    pub id: i64,
    pub user_id: i64,
    pub question_group_id: i64,
    pub answered_at: chrono::DateTime<chrono::Utc>,
    pub total_score: i64,
    /// Client-reported duration, e.g. "1h 24m 45s".
    pub completed_timeframe: String,
}

/// Represents the 'exam_submission_answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSubmissionAnswer {
    pub id: i64,
    pub exam_submission_id: i64,
    pub question_id: i64,
    pub selected_option: String,
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamRequest {
    pub question_group_id: Option<i64>,

    #[serde(default)]
    #[validate(length(min = 1, max = 64, message = "completedTimeframe is required"))]
    pub completed_timeframe: String,

    /// One entry per answered question.
    pub answers: Option<Vec<SubmittedAnswer>>,

    /// Client-side count of correct answers. Only compared against the server's count.
    pub total_score: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: i64,
    /// Option ID as sent by the client; numbers and strings are both accepted.
    #[serde(deserialize_with = "string_or_number")]
    pub selected_option: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub total_questions: i64,
    pub correct_count: i64,
    pub incorrect_count: i64,
    pub completed_timeframe: String,
}

/// Per-answer outcome returned after submitting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub question_id: i64,
    pub selected_option: String,
    pub correct_option_id: i64,
    pub is_correct: bool,
    pub question: QuestionWithOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub submission_id: i64,
    pub summary: SubmissionSummary,
    pub review: Vec<ReviewItem>,
}

/// Listing row: submission joined with its group and user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionListItem {
    #[serde(flatten)]
    pub submission: ExamSubmission,
    pub question_group: Option<GroupRef>,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct AnswerDetail {
    #[serde(flatten)]
    pub answer: ExamSubmissionAnswer,
    pub question: Option<QuestionWithOptions>,
}

/// Full submission with nested answers, questions and options.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub submission: ExamSubmission,
    pub question_group: Option<GroupRef>,
    pub user: Option<UserSummary>,
    pub answers: Vec<AnswerDetail>,
}

/// DTO for administrative score/timeframe correction.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubmissionRequest {
    #[validate(range(min = 0))]
    pub total_score: Option<i64>,
    #[validate(length(min = 1, max = 64))]
    pub completed_timeframe: Option<String>,
}
