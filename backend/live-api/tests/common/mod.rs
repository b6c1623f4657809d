use axum::Router;
use std::sync::Arc;

use quizlive_api::services::auth::StaticTokenAuthorizer;
use quizlive_api::services::store::InMemoryAnswerStore;
use quizlive_api::{config::Config, create_router, services::AppState};

pub async fn create_test_app() -> Router {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    // Short timings so any timer the tests touch resolves quickly
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        lobby_countdown_secs: 1,
        grading_display_secs: 1,
        finished_grace_secs: 5,
    };

    let store = Arc::new(InMemoryAnswerStore::new());
    let app_state = Arc::new(AppState::new(config, store, Arc::new(StaticTokenAuthorizer)));

    // Build test router (same as main app)
    create_router(app_state)
}
