//! Deterministic generator for tests and local runs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{GeneratedQuestion, GenerationError, QuestionGenerator, validate_batch};
use crate::config::OPTIONS_PER_QUESTION;

/// Produces `count` predictable questions without any network call.
///
/// Question `i` (zero-based) has its correct answer at `i % 4`, so callers
/// can grade a batch without reading it back from storage.
pub struct FakeGenerator {
    fail: bool,
    delay: Option<Duration>,
    call_count: AtomicU32,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self {
            fail: false,
            delay: None,
            call_count: AtomicU32::new(0),
        }
    }

    /// A generator whose every call fails with [`GenerationError::EmptyContent`].
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Sleeps before answering; used to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `generate` calls made so far.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Correct option index of the question at `position`.
    pub fn correct_answer_for(position: usize) -> i64 {
        (position % OPTIONS_PER_QUESTION) as i64
    }
}

impl Default for FakeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuestionGenerator for FakeGenerator {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(
        &self,
        exam_name: &str,
        count: usize,
    ) -> Result<Vec<GeneratedQuestion>, GenerationError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(GenerationError::EmptyContent);
        }

        let questions: Vec<GeneratedQuestion> = (0..count)
            .map(|i| GeneratedQuestion {
                question: format!("Questão {} do {}", i + 1, exam_name),
                options: ["A", "B", "C", "D"]
                    .iter()
                    .map(|letter| format!("Alternativa {}", letter))
                    .collect(),
                correct_answer: Self::correct_answer_for(i),
                explanation: format!("A alternativa correta da questão {} é a de índice {}.", i + 1, i % 4),
            })
            .collect();

        validate_batch(&questions, count)?;
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_is_deterministic() {
        let generator = FakeGenerator::new();
        let first = generator.generate("Concurso TJ", 6).await.unwrap();
        let second = generator.generate("Concurso TJ", 6).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[5].correct_answer, 1);
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_fake() {
        let generator = FakeGenerator::failing();
        assert!(generator.generate("X", 1).await.is_err());
        assert_eq!(generator.call_count(), 1);
    }
}
