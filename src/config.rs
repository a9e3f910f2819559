// src/config.rs

use std::env;
use std::time::Duration;
use dotenvy::dotenv;

/// Attempts a free account may create before upgrading.
pub const FREE_ATTEMPTS_LIMIT: i64 = 3;

/// Every generated question carries exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub generation: GenerationConfig,
    pub billing_webhook_secret: Option<String>,
}

/// Credentials and tuning for the question generation backends.
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
    pub google_ai_api_key: Option<String>,
    pub gemini_base_url: Option<String>,
    pub gemini_model: Option<String>,
    /// Forces the deterministic generator (local development only).
    pub force_fake: bool,
    pub timeout_secs: u64,
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://simulados.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let generation = GenerationConfig {
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_base_url: non_empty_var("OPENAI_BASE_URL"),
            openai_model: non_empty_var("OPENAI_MODEL"),
            google_ai_api_key: non_empty_var("GOOGLE_AI_API_KEY"),
            gemini_base_url: non_empty_var("GEMINI_BASE_URL"),
            gemini_model: non_empty_var("GEMINI_MODEL"),
            force_fake: env::var("GENERATION_BACKEND")
                .map(|v| v.eq_ignore_ascii_case("fake"))
                .unwrap_or(false),
            timeout_secs: env::var("GENERATION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        };

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            admin_email: non_empty_var("ADMIN_EMAIL"),
            admin_password: non_empty_var("ADMIN_PASSWORD"),
            generation,
            billing_webhook_secret: non_empty_var("BILLING_WEBHOOK_SECRET"),
        }
    }
}

// Blank values count as unset so an empty `OPENAI_API_KEY=` does not win
// backend selection.
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
