// src/services/attempts.rs

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool, types::Json};

use crate::{
    error::AppError,
    generation::{self, QuestionGenerator},
    models::{
        account::Tier,
        attempt::{
            Attempt, AttemptResults, AttemptStatus, AttemptSummary, CreatedAttempt,
            SubmissionResult, SubmittedAnswer, percentage,
        },
        exam::ExamSummary,
        question::{AttemptQuestion, PublicQuestion, ResultQuestion},
    },
    services::{
        accounts, catalog,
        quota::{self, QuotaDecision},
    },
};

/// Outcome of grading one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GradedAnswer {
    question_id: i64,
    user_answer: Option<i64>,
    is_correct: bool,
}

/// Starts a new attempt on `exam_id` for `account_id`.
///
/// * Checks quota and loads the (active) exam.
/// * Generates the questions, bounded by `timeout`. Nothing is written if
///   this fails, so a failed generation never consumes quota.
/// * In one transaction: charges the quota with a conditional increment,
///   inserts the attempt and its questions.
///
/// Returns the questions without correct answers or explanations.
pub async fn create_attempt(
    pool: &SqlitePool,
    generator: &dyn QuestionGenerator,
    timeout: Duration,
    account_id: i64,
    exam_id: i64,
) -> Result<CreatedAttempt, AppError> {
    let account = accounts::find(pool, account_id).await?;
    if let QuotaDecision::Deny(reason) = quota::can_start_attempt(&account) {
        return Err(AppError::QuotaExceeded(reason.message().to_string()));
    }

    let exam = catalog::find_active(pool, exam_id).await?;
    let count = usize::try_from(exam.questions_count)
        .map_err(|_| AppError::InternalServerError(format!("Exam {} has a negative size", exam.id)))?;

    let generated = generation::generate_with_timeout(generator, &exam.name, count, timeout)
        .await
        .map_err(|e| {
            tracing::error!(
                backend = generator.name(),
                exam_id = exam.id,
                "Question generation failed: {}",
                e
            );
            AppError::from(e)
        })?;

    let mut tx = pool.begin().await?;

    // The check above is advisory; this conditional increment is what keeps
    // two concurrent requests from both taking the last free attempt.
    let charged = sqlx::query(
        r#"
        UPDATE accounts
        SET attempts_used = attempts_used + 1
        WHERE id = $1 AND (tier = 'pro' OR attempts_used < attempts_limit)
        "#,
    )
    .bind(account_id)
    .execute(&mut *tx)
    .await?;

    if charged.rows_affected() == 0 {
        return Err(AppError::QuotaExceeded(
            quota::DenyReason::LimitReached.message().to_string(),
        ));
    }

    let attempt_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO attempts (account_id, exam_id, status, total_questions)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(account_id)
    .bind(exam.id)
    .bind(AttemptStatus::InProgress)
    .bind(exam.questions_count)
    .fetch_one(&mut *tx)
    .await?;

    let mut questions = Vec::with_capacity(generated.len());
    for (position, q) in generated.into_iter().enumerate() {
        let row = sqlx::query_as::<_, AttemptQuestion>(
            r#"
            INSERT INTO attempt_questions
                (attempt_id, position, question_text, options, correct_answer, explanation)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, attempt_id, position, question_text, options,
                      correct_answer, user_answer, is_correct, explanation
            "#,
        )
        .bind(attempt_id)
        .bind(position as i64)
        .bind(q.question)
        .bind(Json(q.options))
        .bind(q.correct_answer)
        .bind(q.explanation)
        .fetch_one(&mut *tx)
        .await?;

        questions.push(PublicQuestion::from(row));
    }

    tx.commit().await?;

    tracing::info!(account_id, attempt_id, exam_id = exam.id, "Attempt created");

    Ok(CreatedAttempt {
        attempt_id,
        exam: ExamSummary {
            id: exam.id,
            name: exam.name,
            organization: exam.organization,
        },
        total_questions: exam.questions_count,
        time_limit: exam.time_limit,
        questions,
    })
}

/// Grades a submission and completes its attempt.
///
/// The attempt is inferred from the submitted question IDs, which must all
/// belong to one attempt owned by `account_id` and still in progress.
/// Questions left out of the submission are graded as wrong. All writes
/// happen in a single transaction; a completed attempt is never re-graded.
pub async fn submit_attempt(
    pool: &SqlitePool,
    account_id: i64,
    answers: &[SubmittedAnswer],
) -> Result<SubmissionResult, AppError> {
    if answers.is_empty() {
        return Err(AppError::Validation("No answers submitted".to_string()));
    }

    let mut seen = HashSet::with_capacity(answers.len());
    for answer in answers {
        if !seen.insert(answer.question_id) {
            return Err(AppError::Validation(format!(
                "Question {} answered more than once",
                answer.question_id
            )));
        }
    }

    // Use QueryBuilder for dynamic IN clause
    let mut query_builder = QueryBuilder::<Sqlite>::new(
        "SELECT id, attempt_id, position, question_text, options,
                correct_answer, user_answer, is_correct, explanation
         FROM attempt_questions WHERE id IN (",
    );
    let mut separated = query_builder.separated(",");
    for answer in answers {
        separated.push_bind(answer.question_id);
    }
    separated.push_unseparated(")");

    let questions: Vec<AttemptQuestion> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await?;

    if questions.is_empty() {
        return Err(AppError::NotFound("Attempt not found".to_string()));
    }

    // Ownership comes first: a foreign question anywhere in the batch is
    // Forbidden, whatever else is wrong with it.
    let attempt_ids: Vec<i64> = questions
        .iter()
        .map(|q| q.attempt_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let mut owning = Vec::with_capacity(attempt_ids.len());
    for id in attempt_ids {
        let attempt = find_attempt(pool, id).await?;
        ensure_owner(&attempt, account_id)?;
        owning.push(attempt);
    }

    let by_id: HashMap<i64, &AttemptQuestion> = questions.iter().map(|q| (q.id, q)).collect();
    if let Some(missing) = answers.iter().find(|a| !by_id.contains_key(&a.question_id)) {
        return Err(AppError::NotFound(format!(
            "Question {} not found",
            missing.question_id
        )));
    }
    if owning.len() > 1 {
        return Err(AppError::Validation(
            "Answers must all belong to the same attempt".to_string(),
        ));
    }

    let Some(attempt) = owning.pop() else {
        return Err(AppError::NotFound("Attempt not found".to_string()));
    };
    let attempt_id = attempt.id;
    if attempt.status == AttemptStatus::Completed {
        return Err(already_submitted(attempt_id));
    }

    let graded = grade_answers(&by_id, answers)?;
    let correct = graded.iter().filter(|g| g.is_correct).count() as i64;

    let mut tx = pool.begin().await?;

    // Guarded transition: a concurrent submission that finalized first
    // leaves zero rows to update here.
    let finalized = sqlx::query(
        r#"
        UPDATE attempts
        SET status = $1, score = $2, correct_answers = $2, completed_at = $3
        WHERE id = $4 AND status = $5
        "#,
    )
    .bind(AttemptStatus::Completed)
    .bind(correct)
    .bind(chrono::Utc::now())
    .bind(attempt_id)
    .bind(AttemptStatus::InProgress)
    .execute(&mut *tx)
    .await?;

    if finalized.rows_affected() == 0 {
        return Err(already_submitted(attempt_id));
    }

    for g in &graded {
        sqlx::query(
            "UPDATE attempt_questions SET user_answer = $1, is_correct = $2 WHERE id = $3 AND is_correct IS NULL",
        )
        .bind(g.user_answer)
        .bind(g.is_correct)
        .bind(g.question_id)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        "UPDATE attempt_questions SET is_correct = FALSE WHERE attempt_id = $1 AND is_correct IS NULL",
    )
    .bind(attempt_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(account_id, attempt_id, correct, "Attempt submitted");

    Ok(SubmissionResult {
        attempt_id,
        score: correct,
        correct_answers: correct,
        total_questions: attempt.total_questions,
        percentage: percentage(correct, attempt.total_questions),
    })
}

/// Returns the graded view of an attempt owned by `account_id`.
///
/// Correct answers are revealed only once the attempt is completed, and
/// explanations only to pro accounts. Counts come from storage as written
/// at submission; only the percentage is derived here.
pub async fn get_results(
    pool: &SqlitePool,
    account_id: i64,
    attempt_id: i64,
) -> Result<AttemptResults, AppError> {
    let attempt = find_attempt(pool, attempt_id).await?;
    ensure_owner(&attempt, account_id)?;

    let account = accounts::find(pool, account_id).await?;

    let exam = sqlx::query_as::<_, ExamSummary>(
        "SELECT id, name, organization FROM exams WHERE id = $1",
    )
    .bind(attempt.exam_id)
    .fetch_one(pool)
    .await?;

    let questions = sqlx::query_as::<_, AttemptQuestion>(
        r#"
        SELECT id, attempt_id, position, question_text, options,
               correct_answer, user_answer, is_correct, explanation
        FROM attempt_questions
        WHERE attempt_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(attempt_id)
    .fetch_all(pool)
    .await?;

    let completed = attempt.status == AttemptStatus::Completed;
    let show_explanations = completed && account.tier == Tier::Pro;

    Ok(AttemptResults {
        id: attempt.id,
        status: attempt.status,
        exam,
        score: attempt.score,
        total_questions: attempt.total_questions,
        correct_answers: attempt.correct_answers,
        percentage: attempt
            .correct_answers
            .map(|c| percentage(c, attempt.total_questions)),
        created_at: attempt.created_at,
        completed_at: attempt.completed_at,
        questions: questions
            .into_iter()
            .map(|q| ResultQuestion::from_question(q, completed, show_explanations))
            .collect(),
    })
}

/// Lists the caller's attempts, newest first.
pub async fn list_attempts(
    pool: &SqlitePool,
    account_id: i64,
) -> Result<Vec<AttemptSummary>, AppError> {
    let mut attempts = sqlx::query_as::<_, AttemptSummary>(
        r#"
        SELECT
            a.id, a.exam_id, e.name AS exam_name, a.status,
            a.total_questions, a.correct_answers, a.created_at, a.completed_at
        FROM attempts a
        JOIN exams e ON e.id = a.exam_id
        WHERE a.account_id = $1
        ORDER BY a.created_at DESC, a.id DESC
        "#,
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;

    for attempt in &mut attempts {
        attempt.percentage = attempt
            .correct_answers
            .map(|c| percentage(c, attempt.total_questions));
    }

    Ok(attempts)
}

async fn find_attempt<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<Attempt, AppError> {
    sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, account_id, exam_id, status, total_questions,
               score, correct_answers, created_at, completed_at
        FROM attempts
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))
}

/// Existence is not hidden: a foreign attempt is Forbidden, not NotFound.
fn ensure_owner(attempt: &Attempt, account_id: i64) -> Result<(), AppError> {
    if attempt.account_id != account_id {
        return Err(AppError::Forbidden(
            "Attempt belongs to another account".to_string(),
        ));
    }
    Ok(())
}

fn already_submitted(attempt_id: i64) -> AppError {
    AppError::Conflict(format!("Attempt {} was already submitted", attempt_id))
}

/// Compares each answer with the stored correct index.
/// An index outside the question's options is rejected; `None` is a skip.
fn grade_answers(
    questions: &HashMap<i64, &AttemptQuestion>,
    answers: &[SubmittedAnswer],
) -> Result<Vec<GradedAnswer>, AppError> {
    answers
        .iter()
        .map(|answer| {
            let question = questions.get(&answer.question_id).ok_or_else(|| {
                AppError::NotFound(format!("Question {} not found", answer.question_id))
            })?;

            if let Some(choice) = answer.user_answer {
                if choice < 0 || choice >= question.options.len() as i64 {
                    return Err(AppError::Validation(format!(
                        "Answer {} is not an option of question {}",
                        choice, answer.question_id
                    )));
                }
            }

            Ok(GradedAnswer {
                question_id: answer.question_id,
                user_answer: answer.user_answer,
                is_correct: answer.user_answer == Some(question.correct_answer),
            })
        })
        .collect()
}
