use crate::config::Config;
use crate::generation::SharedGenerator;
use axum::extract::FromRef;
use sqlx::SqlitePool;

/// Shared state handed to every handler. Built once in `main` (or a test)
/// and passed in explicitly.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub generator: SharedGenerator,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SharedGenerator {
    fn from_ref(state: &AppState) -> Self {
        state.generator.clone()
    }
}
