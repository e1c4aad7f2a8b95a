// File: ./src/server/mod.rs
// HTTP + WebSocket surface over ListService.
pub mod handlers;
pub mod janitor;
pub mod ws;

use crate::hub::Hub;
use crate::service::ListService;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ListService>,
    pub hub: Arc<Hub>,
}

impl AppState {
    pub fn new(service: Arc<ListService>, hub: Arc<Hub>) -> Self {
        Self { service, hub }
    }
}

pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/todos",
            post(handlers::create_list).get(handlers::search_lists),
        )
        .route(
            "/api/v1/todos/:id",
            get(handlers::get_list).put(handlers::update_list),
        )
        .route(
            "/api/v1/todos/:id/duplicate",
            post(handlers::duplicate_list),
        )
        .route("/api/v1/todos/:id/views", post(handlers::record_view))
        .route(
            "/api/v1/todos/:id/likes",
            post(handlers::like_list).delete(handlers::unlike_list),
        )
        .route("/api/v1/tags/trending", get(handlers::trending_tags))
        .route("/ws/todos/:id", get(ws::ws_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
