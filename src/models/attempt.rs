// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{
    exam::ExamSummary,
    question::{PublicQuestion, ResultQuestion},
};

/// Attempt lifecycle. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
}

/// Represents the 'attempts' table in the database.
/// One user taking one generated mock exam.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub account_id: i64,
    pub exam_id: i64,
    pub status: AttemptStatus,
    /// Copied from the exam at creation; never re-read.
    pub total_questions: i64,
    pub score: Option<i64>,
    pub correct_answers: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Rounded share of correct answers, in percent.
///
/// Half-way values round up, so 1 of 8 (12.5%) gives 13.
pub fn percentage(correct_answers: i64, total_questions: i64) -> i64 {
    if total_questions <= 0 {
        return 0;
    }
    (correct_answers as f64 / total_questions as f64 * 100.0).round() as i64
}

/// Row of the caller's attempt history, joined with the exam name.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptSummary {
    pub id: i64,
    pub exam_id: i64,
    pub exam_name: String,
    pub status: AttemptStatus,
    pub total_questions: i64,
    pub correct_answers: Option<i64>,
    #[sqlx(skip)]
    pub percentage: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for starting an attempt.
#[derive(Debug, Deserialize)]
pub struct CreateAttemptRequest {
    pub exam_id: i64,
}

/// DTO returned when an attempt is created.
#[derive(Debug, Serialize)]
pub struct CreatedAttempt {
    pub attempt_id: i64,
    pub exam: ExamSummary,
    pub total_questions: i64,
    /// Minutes.
    pub time_limit: i64,
    pub questions: Vec<PublicQuestion>,
}

/// One answered (or skipped) question in a submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    /// Selected option index; `null` means the question was skipped.
    pub user_answer: Option<i64>,
}

/// DTO for submitting an attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answers: Vec<SubmittedAnswer>,
}

/// DTO returned after grading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionResult {
    pub attempt_id: i64,
    pub score: i64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub percentage: i64,
}

/// Full graded view of an attempt.
#[derive(Debug, Serialize)]
pub struct AttemptResults {
    pub id: i64,
    pub status: AttemptStatus,
    pub exam: ExamSummary,
    pub score: Option<i64>,
    pub total_questions: i64,
    pub correct_answers: Option<i64>,
    pub percentage: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub questions: Vec<ResultQuestion>,
}
