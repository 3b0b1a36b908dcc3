use crate::adapters::MemoryStore;
use crate::config;
use crate::push as push_service;
use crate::state;

use axum::Router;
use axum::routing::{get, post};

mod push;

pub fn app(config: config::AppConfig) -> Router {
    let store = MemoryStore::default();
    let push = push_service::maybe_start_push(&config, &store);
    let state = state::AppState { store, push };

    Router::new()
        .route(
            "/api/tournaments/{tid}/push/vapid-key",
            get(push::push_vapid_key),
        )
        .route(
            "/api/tournaments/{tid}/push/subscribe",
            post(push::push_subscribe),
        )
        .route(
            "/api/tournaments/{tid}/push/unsubscribe",
            post(push::push_unsubscribe),
        )
        .route("/api/tournaments/{tid}/push/status", get(push::push_status))
        .route("/api/tournaments/{tid}/push/test", post(push::push_test))
        .route(
            "/api/tournaments/{tid}/matches/{mid}/notify",
            post(push::match_notify),
        )
        .route("/api/debug/push/jobs", get(push::push_jobs_debug))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
