// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, attempts, auth, billing, exams, profile},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, exams, attempts, billing, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, question generator).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let me_routes = Router::new()
        .route("/", get(profile::get_me))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams))
        .route("/{id}", get(exams::get_exam));

    let attempt_routes = Router::new()
        .route(
            "/",
            get(attempts::list_attempts).post(attempts::create_attempt),
        )
        .route("/submit", post(attempts::submit_attempt))
        .route("/{id}/results", get(attempts::get_results))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let billing_routes = Router::new().route("/webhook", post(billing::webhook));

    let admin_routes = Router::new()
        .route("/exams", post(admin::create_exam))
        .route("/exams/{id}", put(admin::update_exam))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/me", me_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/billing", billing_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, db, generation::FakeGenerator};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let pool = db::connect_in_memory().await.unwrap();
        db::migrate(&pool).await.unwrap();
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "router_test_secret".to_string(),
            jwt_expiration: 60,
            rust_log: "error".to_string(),
            port: 0,
            admin_email: None,
            admin_password: None,
            generation: Default::default(),
            billing_webhook_secret: None,
        };
        create_router(AppState {
            pool,
            config,
            generator: Arc::new(FakeGenerator::new()),
        })
    }

    #[tokio::test]
    async fn test_attempt_routes_require_auth() {
        let app = test_router().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/attempts")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"exam_id":1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_exam_listing_is_public() {
        let app = test_router().await;

        let response = app
            .oneshot(Request::builder().uri("/api/exams").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
