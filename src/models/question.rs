// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// Represents the 'attempt_questions' table in the database.
/// One generated question, owned by exactly one attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttemptQuestion {
    pub id: i64,

    pub attempt_id: i64,

    /// Zero-based order in which the question was generated.
    pub position: i64,

    pub question_text: String,

    /// List of options (always four).
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Index into `options` of the right answer.
    pub correct_answer: i64,

    /// Index chosen by the user; `None` until graded or when skipped.
    pub user_answer: Option<i64>,

    /// Set once, when the attempt is submitted.
    pub is_correct: Option<bool>,

    /// Explanation of the correct answer.
    pub explanation: String,
}

/// DTO for sending a question to the client before submission
/// (excludes correct answer and explanation).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub position: i64,
    pub question_text: String,
    pub options: Vec<String>,
}

impl From<AttemptQuestion> for PublicQuestion {
    fn from(q: AttemptQuestion) -> Self {
        Self {
            id: q.id,
            position: q.position,
            question_text: q.question_text,
            options: q.options.0,
        }
    }
}

/// DTO for a question in the results view.
/// `correct_answer` appears once the attempt is completed; `explanation`
/// additionally requires a pro account.
#[derive(Debug, Serialize)]
pub struct ResultQuestion {
    pub id: i64,
    pub position: i64,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: Option<i64>,
    pub user_answer: Option<i64>,
    pub is_correct: Option<bool>,
    pub explanation: Option<String>,
}

impl ResultQuestion {
    pub fn from_question(q: AttemptQuestion, reveal_answer: bool, reveal_explanation: bool) -> Self {
        Self {
            id: q.id,
            position: q.position,
            question_text: q.question_text,
            options: q.options.0,
            correct_answer: reveal_answer.then_some(q.correct_answer),
            user_answer: q.user_answer,
            is_correct: q.is_correct,
            explanation: reveal_explanation.then_some(q.explanation),
        }
    }
}
