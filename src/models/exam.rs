// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'exams' table in the database.
/// Reference data: one row per public-service exam that can be simulated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exam {
    pub id: i64,

    /// Unique display name (e.g., "Concurso INSS 2024").
    pub name: String,

    pub description: Option<String>,

    /// Hiring organization (e.g., "INSS").
    pub organization: String,

    /// "federal", "estadual" or "municipal".
    pub level: String,

    /// "geral" or "especifico".
    pub area: String,

    /// Number of questions generated per attempt.
    pub questions_count: i64,

    /// Time limit in minutes.
    pub time_limit: i64,

    pub is_active: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Exam fields embedded in attempt responses.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExamSummary {
    pub id: i64,
    pub name: String,
    pub organization: String,
}

/// DTO for creating a new exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub organization: String,
    #[validate(length(min = 1, max = 50))]
    pub level: String,
    #[validate(length(min = 1, max = 50))]
    pub area: String,
    #[validate(range(min = 1, max = 200))]
    pub questions_count: i64,
    #[validate(range(min = 1, max = 1440))]
    pub time_limit: i64,
    pub is_active: Option<bool>,
}

/// DTO for updating an exam. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub organization: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub level: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub area: Option<String>,
    #[validate(range(min = 1, max = 200))]
    pub questions_count: Option<i64>,
    #[validate(range(min = 1, max = 1440))]
    pub time_limit: Option<i64>,
    pub is_active: Option<bool>,
}
