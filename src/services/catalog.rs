// src/services/catalog.rs

use sqlx::{SqliteExecutor, SqlitePool};

use crate::{
    db::is_unique_violation,
    error::AppError,
    models::exam::{CreateExamRequest, Exam, UpdateExamRequest},
};

/// Reference exams inserted at startup when missing:
/// (name, description, organization, level, area, questions, minutes).
const DEFAULT_EXAMS: &[(&str, &str, &str, &str, &str, i64, i64)] = &[
    (
        "Concurso INSS 2024",
        "Simulado para o concurso do Instituto Nacional do Seguro Social",
        "INSS",
        "federal",
        "geral",
        50,
        180,
    ),
    (
        "Concurso Banco do Brasil 2024",
        "Simulado para o concurso do Banco do Brasil",
        "Banco do Brasil",
        "federal",
        "especifico",
        40,
        150,
    ),
    (
        "Concurso Polícia Civil SP 2024",
        "Simulado para o concurso da Polícia Civil de São Paulo",
        "Polícia Civil SP",
        "estadual",
        "especifico",
        60,
        240,
    ),
    (
        "Concurso Prefeitura São Paulo 2024",
        "Simulado para concursos da Prefeitura de São Paulo",
        "Prefeitura SP",
        "municipal",
        "geral",
        45,
        180,
    ),
    (
        "Concurso Receita Federal 2024",
        "Simulado para o concurso da Receita Federal",
        "Receita Federal",
        "federal",
        "especifico",
        70,
        300,
    ),
    (
        "Concurso Tribunal de Justiça 2024",
        "Simulado para concursos de Tribunais de Justiça",
        "TJ",
        "estadual",
        "especifico",
        50,
        200,
    ),
];

/// Lists active exams, newest first.
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Exam>, AppError> {
    let exams = sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, name, description, organization, level, area,
               questions_count, time_limit, is_active, created_at
        FROM exams
        WHERE is_active = 1
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(exams)
}

/// Retrieves a single exam by ID, active or not.
pub async fn find<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, name, description, organization, level, area,
               questions_count, time_limit, is_active, created_at
        FROM exams
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::NotFound("Exam not found".to_string()))
}

/// Retrieves an exam that can be used for a new attempt.
/// Inactive exams are reported as missing.
pub async fn find_active<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<Exam, AppError> {
    let exam = find(executor, id).await?;
    if !exam.is_active {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }
    Ok(exam)
}

pub async fn create(pool: &SqlitePool, req: &CreateExamRequest) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>(
        r#"
        INSERT INTO exams (name, description, organization, level, area, questions_count, time_limit, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, name, description, organization, level, area,
                  questions_count, time_limit, is_active, created_at
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.organization)
    .bind(&req.level)
    .bind(&req.area)
    .bind(req.questions_count)
    .bind(req.time_limit)
    .bind(req.is_active.unwrap_or(true))
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Exam '{}' already exists", req.name))
        } else {
            tracing::error!("Failed to create exam: {:?}", e);
            AppError::from(e)
        }
    })
}

/// Applies the fields present in `req`. Attempts already created keep the
/// question count they copied at creation time.
pub async fn update(pool: &SqlitePool, id: i64, req: &UpdateExamRequest) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>(
        r#"
        UPDATE exams SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            organization = COALESCE($3, organization),
            level = COALESCE($4, level),
            area = COALESCE($5, area),
            questions_count = COALESCE($6, questions_count),
            time_limit = COALESCE($7, time_limit),
            is_active = COALESCE($8, is_active)
        WHERE id = $9
        RETURNING id, name, description, organization, level, area,
                  questions_count, time_limit, is_active, created_at
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.organization)
    .bind(&req.level)
    .bind(&req.area)
    .bind(req.questions_count)
    .bind(req.time_limit)
    .bind(req.is_active)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("An exam with this name already exists".to_string())
        } else {
            AppError::from(e)
        }
    })?
    .ok_or(AppError::NotFound("Exam not found".to_string()))
}

/// Inserts the reference exams that are not present yet.
/// Returns how many rows were added.
pub async fn seed_defaults(pool: &SqlitePool) -> Result<u64, AppError> {
    let mut inserted = 0;

    for &(name, description, organization, level, area, questions, minutes) in DEFAULT_EXAMS {
        let result = sqlx::query(
            r#"
            INSERT INTO exams (name, description, organization, level, area, questions_count, time_limit)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(organization)
        .bind(level)
        .bind(area)
        .bind(questions)
        .bind(minutes)
        .execute(pool)
        .await?;

        inserted += result.rows_affected();
    }

    if inserted > 0 {
        tracing::info!("Seeded {} reference exams", inserted);
    }
    Ok(inserted)
}
