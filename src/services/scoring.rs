// src/services/scoring.rs

use std::collections::{HashMap, HashSet};

use crate::{
    error::AppError,
    models::{
        exam_submission::{ReviewItem, SubmissionSummary, SubmittedAnswer},
        question::QuestionWithOptions,
    },
};

/// Outcome of checking a set of answers against a group's answer key.
#[derive(Debug)]
pub struct Evaluation {
    pub review: Vec<ReviewItem>,
    pub correct_count: i64,
}

/// Scores `answers` against `questions`, the full question set of one group.
///
/// Each answer is correct when its `selected_option` equals the id of the
/// question's correct option, compared as strings. Fails with
/// `MalformedSubmission` if an answer names a question outside the set, names
/// the same question twice, or hits a question without a single correct option.
pub fn evaluate(
    questions: &[QuestionWithOptions],
    answers: &[SubmittedAnswer],
) -> Result<Evaluation, AppError> {
    let by_id: HashMap<i64, &QuestionWithOptions> =
        questions.iter().map(|q| (q.question.id, q)).collect();
    let mut seen = HashSet::with_capacity(answers.len());
    let mut review = Vec::with_capacity(answers.len());
    let mut correct_count = 0;

    for answer in answers {
        if !seen.insert(answer.question_id) {
            return Err(AppError::MalformedSubmission(format!(
                "Question {} was answered more than once",
                answer.question_id
            )));
        }

        let question = by_id.get(&answer.question_id).ok_or_else(|| {
            AppError::MalformedSubmission(format!(
                "Question {} does not belong to this question group",
                answer.question_id
            ))
        })?;

        let correct_option = question.correct_option().ok_or_else(|| {
            AppError::MalformedSubmission(format!(
                "Question {} does not have exactly one correct option",
                answer.question_id
            ))
        })?;

        let is_correct = correct_option.id.to_string() == answer.selected_option;
        if is_correct {
            correct_count += 1;
        }

        review.push(ReviewItem {
            question_id: answer.question_id,
            selected_option: answer.selected_option.clone(),
            correct_option_id: correct_option.id,
            is_correct,
            question: (*question).clone(),
        });
    }

    Ok(Evaluation {
        review,
        correct_count,
    })
}

pub fn summarize(
    total_questions: usize,
    correct_count: i64,
    completed_timeframe: &str,
) -> SubmissionSummary {
    let total_questions = total_questions as i64;
    SubmissionSummary {
        total_questions,
        correct_count,
        incorrect_count: total_questions - correct_count,
        completed_timeframe: completed_timeframe.to_string(),
    }
}
