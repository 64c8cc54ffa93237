//! REST/SSE API for the Huddle Up board service

pub mod handlers;
pub mod sse;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::coach::CoachClient;
use crate::db::Store;
use crate::state::SharedState;
use crate::timeline::LayoutParams;
use huddle_common::config::SavingsPolicy;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Data store handle
    pub store: Store,
    /// Broadcast + coach session state
    pub shared: Arc<SharedState>,
    /// Coaching backend client
    pub coach: Arc<CoachClient>,
    /// Suggestion adoption policy
    pub policy: SavingsPolicy,
    /// Timeline layout constants
    pub layout: LayoutParams,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no prefix for health endpoint)
        .route("/health", get(handlers::health))
        // API v1 routes
        .nest(
            "/api/v1",
            Router::new()
                // Board data
                .route("/boards/:board_id", get(handlers::get_board))
                .route("/boards/:board_id/events", get(handlers::get_board_events))
                .route("/boards/:board_id/timeline", get(handlers::get_board_timeline))
                // Per-event detail
                .route(
                    "/events/:event_id/transactions",
                    get(handlers::get_event_transactions),
                )
                .route(
                    "/events/:event_id/suggestions",
                    get(handlers::get_event_suggestions),
                )
                // Suggestion voting
                .route(
                    "/suggestions/:suggestion_id/vote",
                    post(handlers::vote_suggestion),
                )
                // Change-notification stream
                .route("/events", get(handlers::event_stream))
                // Voice coach exchange
                .route("/coach/chat", post(handlers::coach_chat)),
        )
        .with_state(state)
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}
