// tests/api_tests.rs

mod common;

use common::{
    TEST_WEBHOOK_SECRET, create_small_exam, spawn_app, spawn_app_with_config, test_config,
};
use serde_json::{Value, json};
use simulados::generation::fake::FakeGenerator;
use std::sync::Arc;

/// Answers for a created attempt: the first `correct` questions right,
/// the rest wrong.
fn answers_with_correct(created: &Value, correct: usize) -> Value {
    let questions = created["questions"].as_array().unwrap();
    let answers: Vec<Value> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let position = q["position"].as_i64().unwrap() as usize;
            let right = FakeGenerator::correct_answer_for(position);
            let answer = if i < correct { right } else { (right + 1) % 4 };
            json!({ "question_id": q["id"], "user_answer": answer })
        })
        .collect();
    Value::Array(answers)
}

#[tokio::test]
async fn health_check_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_creates_free_account() {
    let app = spawn_app().await;
    let (_, token) = app.register_and_login().await;

    let me = app.me(&token).await;
    assert_eq!(me["tier"], "free");
    assert_eq!(me["attempts_used"], 0);
    assert_eq!(me["attempts_limit"], 3);
    assert_eq!(me["attempts_remaining"], 3);
    assert!(me.get("password").is_none());
}

#[tokio::test]
async fn register_rejects_invalid_payload_and_duplicates() {
    let app = spawn_app().await;
    let url = format!("{}/api/auth/register", app.address);

    let response = app
        .client
        .post(&url)
        .json(&json!({ "name": "Ana", "email": "not-an-email", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let body = json!({ "name": "Ana", "email": "Ana@Example.com", "password": "password123" });
    let response = app.client.post(&url).json(&body).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let duplicate = json!({ "name": "Ana", "email": "ana@example.com", "password": "password123" });
    let response = app.client.post(&url).json(&duplicate).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 409);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["kind"], "conflict");
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = spawn_app().await;
    app.client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({ "name": "Bia", "email": "bia@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();

    let response = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "email": "bia@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn protected_routes_require_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/api/attempts", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .get(format!("{}/api/me", app.address))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn list_exams_returns_seeded_catalog() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/api/exams", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let exams: Vec<Value> = response.json().await.unwrap();
    assert_eq!(exams.len(), 6);
    assert!(exams.iter().any(|e| e["name"] == "Concurso INSS 2024"));

    let response = app
        .client
        .get(format!("{}/api/exams/999999", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn attempt_lifecycle_grades_and_reveals_answers() {
    let app = spawn_app().await;
    let exam_id = create_small_exam(&app.pool, 5).await;
    let (_, token) = app.register_and_login().await;

    // Create
    let response = app.create_attempt(&token, exam_id).await;
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.unwrap();
    let attempt_id = created["attempt_id"].as_i64().unwrap();
    assert_eq!(created["total_questions"], 5);
    assert_eq!(created["time_limit"], 30);

    let questions = created["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 5);
    for q in questions {
        assert!(q.get("correct_answer").is_none());
        assert!(q.get("explanation").is_none());
        assert_eq!(q["options"].as_array().unwrap().len(), 4);
    }

    // Quota charged
    let me = app.me(&token).await;
    assert_eq!(me["attempts_used"], 1);
    assert_eq!(me["attempts_remaining"], 2);

    // Results before submission hide the answers
    let response = app.results(&token, attempt_id).await;
    assert_eq!(response.status().as_u16(), 200);
    let pending: Value = response.json().await.unwrap();
    assert_eq!(pending["status"], "in_progress");
    assert!(pending["score"].is_null());
    assert!(pending["questions"][0]["correct_answer"].is_null());

    // Submit 3 of 5 correct
    let response = app.submit(&token, answers_with_correct(&created, 3)).await;
    assert_eq!(response.status().as_u16(), 200);
    let submitted: Value = response.json().await.unwrap();
    assert_eq!(submitted["attempt_id"], attempt_id);
    assert_eq!(submitted["score"], 3);
    assert_eq!(submitted["correct_answers"], 3);
    assert_eq!(submitted["total_questions"], 5);
    assert_eq!(submitted["percentage"], 60);

    // Results match the submission and are stable across reads
    let first: Value = app.results(&token, attempt_id).await.json().await.unwrap();
    let second: Value = app.results(&token, attempt_id).await.json().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first["status"], "completed");
    assert_eq!(first["correct_answers"], 3);
    assert_eq!(first["percentage"], 60);
    assert!(!first["completed_at"].is_null());
    assert_eq!(first["questions"][0]["correct_answer"], 0);
    assert_eq!(first["questions"][0]["is_correct"], true);
    assert_eq!(first["questions"][4]["is_correct"], false);
    // Free accounts do not see explanations.
    assert!(first["questions"][0]["explanation"].is_null());

    // Listing
    let list: Vec<Value> = app
        .client
        .get(format!("{}/api/attempts", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], attempt_id);
    assert_eq!(list[0]["percentage"], 60);
}

#[tokio::test]
async fn resubmission_is_rejected() {
    let app = spawn_app().await;
    let exam_id = create_small_exam(&app.pool, 4).await;
    let (_, token) = app.register_and_login().await;

    let created: Value = app.create_attempt(&token, exam_id).await.json().await.unwrap();
    let attempt_id = created["attempt_id"].as_i64().unwrap();

    let response = app.submit(&token, answers_with_correct(&created, 4)).await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app.submit(&token, answers_with_correct(&created, 0)).await;
    assert_eq!(response.status().as_u16(), 409);

    let results: Value = app.results(&token, attempt_id).await.json().await.unwrap();
    assert_eq!(results["correct_answers"], 4);
    assert_eq!(results["percentage"], 100);
}

#[tokio::test]
async fn skipped_questions_count_as_wrong() {
    let app = spawn_app().await;
    let exam_id = create_small_exam(&app.pool, 3).await;
    let (_, token) = app.register_and_login().await;

    let created: Value = app.create_attempt(&token, exam_id).await.json().await.unwrap();
    let first = &created["questions"][0];
    let answers = json!([
        { "question_id": first["id"], "user_answer": FakeGenerator::correct_answer_for(0) },
        { "question_id": created["questions"][1]["id"], "user_answer": null },
    ]);

    let submitted: Value = app.submit(&token, answers).await.json().await.unwrap();
    assert_eq!(submitted["correct_answers"], 1);
    assert_eq!(submitted["total_questions"], 3);
    assert_eq!(submitted["percentage"], 33);
}

#[tokio::test]
async fn submit_rejects_out_of_range_answer() {
    let app = spawn_app().await;
    let exam_id = create_small_exam(&app.pool, 2).await;
    let (_, token) = app.register_and_login().await;

    let created: Value = app.create_attempt(&token, exam_id).await.json().await.unwrap();
    let answers = json!([{ "question_id": created["questions"][0]["id"], "user_answer": 7 }]);

    let response = app.submit(&token, answers).await;
    assert_eq!(response.status().as_u16(), 400);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["kind"], "validation");
}

#[tokio::test]
async fn other_accounts_cannot_touch_an_attempt() {
    let app = spawn_app().await;
    let exam_id = create_small_exam(&app.pool, 3).await;
    let (_, owner) = app.register_and_login().await;
    let (_, intruder) = app.register_and_login().await;

    let created: Value = app.create_attempt(&owner, exam_id).await.json().await.unwrap();
    let attempt_id = created["attempt_id"].as_i64().unwrap();

    let response = app.results(&intruder, attempt_id).await;
    assert_eq!(response.status().as_u16(), 403);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["kind"], "forbidden");

    let response = app.submit(&intruder, answers_with_correct(&created, 3)).await;
    assert_eq!(response.status().as_u16(), 403);

    // The owner can still submit.
    let response = app.submit(&owner, answers_with_correct(&created, 3)).await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn free_quota_is_enforced() {
    let app = spawn_app().await;
    let exam_id = create_small_exam(&app.pool, 1).await;
    let (_, token) = app.register_and_login().await;

    for _ in 0..3 {
        let response = app.create_attempt(&token, exam_id).await;
        assert_eq!(response.status().as_u16(), 201);
    }

    let response = app.create_attempt(&token, exam_id).await;
    assert_eq!(response.status().as_u16(), 403);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["kind"], "quota_exceeded");

    let me = app.me(&token).await;
    assert_eq!(me["attempts_used"], 3);
    assert_eq!(me["attempts_remaining"], 0);
}

#[tokio::test]
async fn unknown_exam_is_not_found() {
    let app = spawn_app().await;
    let (_, token) = app.register_and_login().await;

    let response = app.create_attempt(&token, 424242).await;
    assert_eq!(response.status().as_u16(), 404);

    let me = app.me(&token).await;
    assert_eq!(me["attempts_used"], 0);
}

#[tokio::test]
async fn webhook_upgrades_account_to_pro() {
    let app = spawn_app().await;
    let exam_id = create_small_exam(&app.pool, 1).await;
    let (account_id, token) = app.register_and_login().await;
    let url = format!("{}/api/billing/webhook", app.address);

    let event = json!({
        "type": "checkout.session.completed",
        "data": { "object": {
            "customer": "cus_123",
            "subscription": "sub_123",
            "metadata": { "account_id": account_id.to_string() }
        }}
    });

    // Missing secret
    let response = app.client.post(&url).json(&event).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .post(&url)
        .header("x-webhook-secret", TEST_WEBHOOK_SECRET)
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let me = app.me(&token).await;
    assert_eq!(me["tier"], "pro");
    assert!(me["attempts_limit"].is_null());

    // Pro accounts have no ceiling.
    for _ in 0..4 {
        let response = app.create_attempt(&token, exam_id).await;
        assert_eq!(response.status().as_u16(), 201);
    }

    // Pro accounts see explanations once completed.
    let created: Value = app.create_attempt(&token, exam_id).await.json().await.unwrap();
    let attempt_id = created["attempt_id"].as_i64().unwrap();
    app.submit(&token, answers_with_correct(&created, 1)).await;
    let results: Value = app.results(&token, attempt_id).await.json().await.unwrap();
    assert!(results["questions"][0]["explanation"].is_string());

    // Cancellation drops back to free.
    let canceled = json!({
        "type": "customer.subscription.deleted",
        "data": { "object": { "customer": "cus_123" } }
    });
    let response = app
        .client
        .post(&url)
        .header("x-webhook-secret", TEST_WEBHOOK_SECRET)
        .json(&canceled)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let me = app.me(&token).await;
    assert_eq!(me["tier"], "free");
    assert_eq!(me["attempts_limit"], 3);
    assert_eq!(me["attempts_remaining"], 0);
}

#[tokio::test]
async fn webhook_without_configured_secret_refuses_events() {
    let config = simulados::config::Config {
        billing_webhook_secret: None,
        ..test_config()
    };
    let app = spawn_app_with_config(config, Arc::new(FakeGenerator::new())).await;
    let (account_id, token) = app.register_and_login().await;

    let event = json!({
        "type": "checkout.session.completed",
        "data": { "object": { "metadata": { "account_id": account_id.to_string() } } }
    });

    let response = app
        .client
        .post(format!("{}/api/billing/webhook", app.address))
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 503);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["kind"], "configuration");

    let response = app
        .client
        .post(format!("{}/api/billing/webhook", app.address))
        .header("x-webhook-secret", "anything")
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 503);

    let me = app.me(&token).await;
    assert_eq!(me["tier"], "free");
}

#[tokio::test]
async fn webhook_rejects_wrong_secret() {
    let app = spawn_app().await;
    let (account_id, token) = app.register_and_login().await;

    let event = json!({
        "type": "checkout.session.completed",
        "data": { "object": { "metadata": { "account_id": account_id.to_string() } } }
    });

    let response = app
        .client
        .post(format!("{}/api/billing/webhook", app.address))
        .header("x-webhook-secret", "whsec_wrong")
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let me = app.me(&token).await;
    assert_eq!(me["tier"], "free");
}
