//! Question generation backends.
//!
//! Every call to an external text-generation service goes through a
//! [`QuestionGenerator`]. The concrete backend is chosen once, at startup,
//! by [`from_config`]; the rest of the service only sees the trait object.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{GenerationConfig, OPTIONS_PER_QUESTION};

pub mod fake;
pub mod gemini;
pub mod openai;
pub mod prompts;

pub use fake::FakeGenerator;
pub use gemini::GeminiGenerator;
pub use openai::OpenAiGenerator;

/// Errors raised while producing questions.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Neither backend credential is available.
    #[error("no question generation backend is configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("backend returned empty content")]
    EmptyContent,

    #[error("failed to parse generated questions: {0}")]
    Parse(#[from] serde_json::Error),

    /// The JSON parsed but does not describe a usable question batch.
    #[error("generated questions are malformed: {0}")]
    InvalidShape(String),

    #[error("generation timed out after {0}s")]
    Timeout(u64),
}

/// One multiple-choice question as produced by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "correctAnswer", alias = "correct_answer")]
    pub correct_answer: i64,
    #[serde(default)]
    pub explanation: String,
}

/// A backend able to turn an exam topic into multiple-choice questions.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Short backend identifier used in logs.
    fn name(&self) -> &str;

    /// Produces `count` questions about `exam_name`.
    ///
    /// Implementations make a single backend call and return the batch
    /// only after [`validate_batch`] accepted it.
    async fn generate(
        &self,
        exam_name: &str,
        count: usize,
    ) -> Result<Vec<GeneratedQuestion>, GenerationError>;
}

pub type SharedGenerator = Arc<dyn QuestionGenerator>;

/// Picks the backend from the available credentials.
///
/// OpenAI wins when both keys are present. The fake generator is only used
/// when explicitly forced and no real credential exists.
pub fn from_config(config: &GenerationConfig) -> Result<SharedGenerator, GenerationError> {
    if let Some(key) = &config.openai_api_key {
        return Ok(Arc::new(OpenAiGenerator::new(
            key,
            config.openai_base_url.clone(),
            config.openai_model.clone(),
        )));
    }

    if let Some(key) = &config.google_ai_api_key {
        return Ok(Arc::new(GeminiGenerator::new(
            key,
            config.gemini_base_url.clone(),
            config.gemini_model.clone(),
        )));
    }

    if config.force_fake {
        return Ok(Arc::new(FakeGenerator::new()));
    }

    Err(GenerationError::NotConfigured)
}

/// Runs one generation bounded by `timeout`.
pub async fn generate_with_timeout(
    generator: &dyn QuestionGenerator,
    exam_name: &str,
    count: usize,
    timeout: Duration,
) -> Result<Vec<GeneratedQuestion>, GenerationError> {
    match tokio::time::timeout(timeout, generator.generate(exam_name, count)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                backend = generator.name(),
                "question generation exceeded {}s",
                timeout.as_secs()
            );
            Err(GenerationError::Timeout(timeout.as_secs()))
        }
    }
}

/// Backends answer either with a bare array or wrapped in `{"questions": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionPayload {
    Bare(Vec<GeneratedQuestion>),
    Wrapped { questions: Vec<GeneratedQuestion> },
}

/// Parses backend text into questions and checks the batch shape.
pub fn parse_questions(
    text: &str,
    expected: usize,
) -> Result<Vec<GeneratedQuestion>, GenerationError> {
    let text = strip_json_fences(text);
    if text.is_empty() {
        return Err(GenerationError::EmptyContent);
    }

    let questions = match serde_json::from_str::<QuestionPayload>(text)? {
        QuestionPayload::Bare(questions) => questions,
        QuestionPayload::Wrapped { questions } => questions,
    };

    validate_batch(&questions, expected)?;
    Ok(questions)
}

/// Backend output is untrusted: count, option count and answer bounds are
/// all checked before anything is persisted.
pub fn validate_batch(
    questions: &[GeneratedQuestion],
    expected: usize,
) -> Result<(), GenerationError> {
    if questions.len() != expected {
        return Err(GenerationError::InvalidShape(format!(
            "expected {} questions, got {}",
            expected,
            questions.len()
        )));
    }

    for (index, q) in questions.iter().enumerate() {
        let n = index + 1;
        if q.question.trim().is_empty() {
            return Err(GenerationError::InvalidShape(format!(
                "question {n} has no text"
            )));
        }
        if q.options.len() != OPTIONS_PER_QUESTION {
            return Err(GenerationError::InvalidShape(format!(
                "question {n} has {} options, expected {}",
                q.options.len(),
                OPTIONS_PER_QUESTION
            )));
        }
        if q.options.iter().any(|o| o.trim().is_empty()) {
            return Err(GenerationError::InvalidShape(format!(
                "question {n} has an empty option"
            )));
        }
        if q.correct_answer < 0 || q.correct_answer >= OPTIONS_PER_QUESTION as i64 {
            return Err(GenerationError::InvalidShape(format!(
                "question {n} has correct answer index {} out of range",
                q.correct_answer
            )));
        }
        if q.explanation.trim().is_empty() {
            return Err(GenerationError::InvalidShape(format!(
                "question {n} has no explanation"
            )));
        }
    }

    Ok(())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));

    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim()),
        None => text,
    }
}
