// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::user::UserSummary;

/// Represents the 'question_groups' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionGroup {
    pub id: i64,
    /// Unique group title.
    pub title: String,
    pub description: String,
    /// User ID of the author.
    pub created_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Group joined with its author.
#[derive(Debug, Serialize)]
pub struct GroupWithCreator {
    #[serde(flatten)]
    pub group: QuestionGroup,
    pub creator: Option<UserSummary>,
}

/// Group with its questions; `Q` is either the full or the public question view.
#[derive(Debug, Serialize)]
pub struct GroupWithQuestions<Q> {
    #[serde(flatten)]
    pub group: QuestionGroup,
    pub questions: Vec<Q>,
}

/// `{id, title}` projection embedded in submissions.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GroupRef {
    pub id: i64,
    pub title: String,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub group_id: i64,
    /// The text content of the question.
    pub question: String,
    /// Explanation shown after the exam.
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

impl QuestionWithOptions {
    /// The option flagged correct, if exactly one exists.
    pub fn correct_option(&self) -> Option<&QuestionOption> {
        let mut correct = self.options.iter().filter(|o| o.is_correct);
        match (correct.next(), correct.next()) {
            (Some(option), None) => Some(option),
            _ => None,
        }
    }
}

/// DTO for sending a question to exam takers (excludes correctness and explanation).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub group_id: i64,
    pub question: String,
    pub options: Vec<PublicOption>,
}

#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

impl From<QuestionWithOptions> for PublicQuestion {
    fn from(q: QuestionWithOptions) -> Self {
        Self {
            id: q.question.id,
            group_id: q.question.group_id,
            question: q.question.question,
            options: q
                .options
                .into_iter()
                .map(|o| PublicOption { id: o.id, text: o.text })
                .collect(),
        }
    }
}

/// DTO for creating a question group.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Question Group title is required"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// DTO for updating a question group. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGroupRequest {
    #[validate(length(max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// One option inside a create/update payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewOption {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct NewQuestion {
    #[serde(default)]
    #[validate(length(min = 1, max = 5000, message = "Each question must have text and options"))]
    pub question: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(nested, custom(function = validate_options))]
    pub options: Vec<NewOption>,
}

/// DTO for uploading several questions into one group.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionsRequest {
    pub group_id: Option<i64>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Questions array is required"), nested)]
    pub questions: Vec<NewQuestion>,
}

/// DTO for updating a question. `options`, when present, replaces every option.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    pub group_id: Option<i64>,
    #[validate(length(min = 1, max = 5000))]
    pub question: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(nested, custom(function = validate_options))]
    pub options: Option<Vec<NewOption>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListParams {
    pub group_id: Option<i64>,
}

/// Every question needs at least one option and exactly one correct option.
fn validate_options(options: &[NewOption]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty")
            .with_message("Each question must have text and options".into()));
    }
    if options.iter().filter(|o| o.is_correct).count() != 1 {
        return Err(validator::ValidationError::new("exactly_one_correct_option")
            .with_message("Each question must have exactly one correct option".into()));
    }
    Ok(())
}
