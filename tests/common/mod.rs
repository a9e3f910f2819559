// tests/common/mod.rs

#![allow(dead_code)]

use serde_json::{Value, json};
use simulados::{
    config::{Config, GenerationConfig},
    db,
    generation::{SharedGenerator, fake::FakeGenerator},
    models::exam::CreateExamRequest,
    routes,
    services::catalog,
    state::AppState,
};
use sqlx::SqlitePool;
use std::sync::Arc;

pub const TEST_JWT_SECRET: &str = "test_secret_for_integration_tests";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

/// Fresh in-memory database with the schema applied.
pub async fn test_pool() -> SqlitePool {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to open in-memory SQLite");
    db::migrate(&pool).await.expect("Failed to migrate database");
    pool
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        admin_email: None,
        admin_password: None,
        generation: GenerationConfig {
            force_fake: true,
            timeout_secs: 5,
            ..Default::default()
        },
        billing_webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
    }
}

/// Spawns the app on a random port with the deterministic generator.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(FakeGenerator::new())).await
}

pub async fn spawn_app_with(generator: SharedGenerator) -> TestApp {
    spawn_app_with_config(test_config(), generator).await
}

pub async fn spawn_app_with_config(config: Config, generator: SharedGenerator) -> TestApp {
    let pool = test_pool().await;
    catalog::seed_defaults(&pool).await.expect("Failed to seed exams");

    let state = AppState {
        pool: pool.clone(),
        config,
        generator,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    }
}

/// Inserts a small exam so attempts stay quick to grade.
pub async fn create_small_exam(pool: &SqlitePool, questions_count: i64) -> i64 {
    let name = format!("Simulado de teste {}", uuid::Uuid::new_v4());
    let exam = catalog::create(
        pool,
        &CreateExamRequest {
            name,
            description: None,
            organization: "Banca Teste".to_string(),
            level: "federal".to_string(),
            area: "geral".to_string(),
            questions_count,
            time_limit: 30,
            is_active: Some(true),
        },
    )
    .await
    .expect("Failed to create exam");
    exam.id
}

/// Inserts an account directly and returns its id.
pub async fn insert_account(pool: &SqlitePool) -> i64 {
    let email = format!("{}@example.com", uuid::Uuid::new_v4());
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO accounts (name, email, password) VALUES ('Teste', $1, 'x') RETURNING id",
    )
    .bind(email)
    .fetch_one(pool)
    .await
    .expect("Failed to insert account")
}

impl TestApp {
    /// Registers a fresh account and logs in. Returns (account id, token).
    pub async fn register_and_login(&self) -> (i64, String) {
        let email = format!("{}@example.com", uuid::Uuid::new_v4());
        let password = "password123";

        let response = self
            .client
            .post(format!("{}/api/auth/register", self.address))
            .json(&json!({ "name": "Candidato", "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);
        let account: Value = response.json().await.unwrap();
        let id = account["id"].as_i64().unwrap();

        let response = self
            .client
            .post(format!("{}/api/auth/login", self.address))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        let token = body["token"].as_str().unwrap().to_string();

        (id, token)
    }

    pub async fn create_attempt(&self, token: &str, exam_id: i64) -> reqwest::Response {
        self.client
            .post(format!("{}/api/attempts", self.address))
            .bearer_auth(token)
            .json(&json!({ "exam_id": exam_id }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn submit(&self, token: &str, answers: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/attempts/submit", self.address))
            .bearer_auth(token)
            .json(&json!({ "answers": answers }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn results(&self, token: &str, attempt_id: i64) -> reqwest::Response {
        self.client
            .get(format!("{}/api/attempts/{}/results", self.address, attempt_id))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn me(&self, token: &str) -> Value {
        self.client
            .get(format!("{}/api/me", self.address))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
            .json()
            .await
            .unwrap()
    }
}
