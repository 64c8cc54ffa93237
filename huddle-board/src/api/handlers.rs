//! HTTP request handlers
//!
//! Implements the REST endpoints over the store plus the two SSE surfaces
//! (change notifications and the coach relay).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use super::{sse, AppState};
use crate::coach::{run_exchange, CoachChatRequest};
use crate::db::VoteOutcome;
use crate::timeline::{layout_timeline, weekly_spending, TimelineLayout, WeeklySpending};
use huddle_common::events::HuddleEvent;
use huddle_common::models::{Board, EventRecord, Suggestion, Transaction};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    events: Vec<EventRecord>,
}

#[derive(Debug, Serialize)]
pub struct TimelineResponse {
    layout: TimelineLayout,
    spending: WeeklySpending,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    transactions: Vec<Transaction>,
    total: f64,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    suggestions: Vec<Suggestion>,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    suggestion: Suggestion,
    just_completed: bool,
    deduction: Option<f64>,
    predicted_amount: Option<f64>,
}

type HandlerError = (StatusCode, Json<StatusResponse>);

fn internal_error(e: huddle_common::Error) -> HandlerError {
    error!("request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(StatusResponse {
            status: e.to_string(),
        }),
    )
}

fn not_found(what: &str) -> HandlerError {
    (
        StatusCode::NOT_FOUND,
        Json(StatusResponse {
            status: format!("{what} not found"),
        }),
    )
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "module": "huddle-board",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port,
    }))
}

// ============================================================================
// Board Endpoints
// ============================================================================

/// GET /api/v1/boards/:board_id - Board detail
pub async fn get_board(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<Board>, HandlerError> {
    state
        .store
        .get_board(board_id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("board"))
}

/// GET /api/v1/boards/:board_id/events - Events with spend totals
pub async fn get_board_events(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<EventsResponse>, HandlerError> {
    let events = state
        .store
        .list_events(board_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(EventsResponse { events }))
}

/// GET /api/v1/boards/:board_id/timeline - Row-packed layout plus spending
pub async fn get_board_timeline(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<TimelineResponse>, HandlerError> {
    let events = state
        .store
        .list_events(board_id)
        .await
        .map_err(internal_error)?;

    let layout = layout_timeline(&events, &state.layout);
    let spending = weekly_spending(&events, &state.layout);
    Ok(Json(TimelineResponse { layout, spending }))
}

// ============================================================================
// Event Detail Endpoints
// ============================================================================

/// GET /api/v1/events/:event_id/transactions - Linked transactions
pub async fn get_event_transactions(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<TransactionsResponse>, HandlerError> {
    let transactions = state
        .store
        .list_transactions(event_id)
        .await
        .map_err(internal_error)?;
    let total = transactions.iter().map(|t| t.amount).sum();
    Ok(Json(TransactionsResponse {
        transactions,
        total,
    }))
}

/// GET /api/v1/events/:event_id/suggestions - Spending suggestions
pub async fn get_event_suggestions(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<SuggestionsResponse>, HandlerError> {
    let suggestions = state
        .store
        .list_suggestions(event_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(SuggestionsResponse { suggestions }))
}

// ============================================================================
// Suggestion Voting
// ============================================================================

/// POST /api/v1/suggestions/:suggestion_id/vote - Cast one vote
pub async fn vote_suggestion(
    State(state): State<AppState>,
    Path(suggestion_id): Path<i64>,
) -> Result<Json<VoteResponse>, HandlerError> {
    let outcome = state
        .store
        .vote_suggestion(suggestion_id, &state.policy)
        .await
        .map_err(|e| match e {
            huddle_common::Error::NotFound(_) => not_found("suggestion"),
            other => internal_error(other),
        })?;

    broadcast_vote(&state, &outcome);

    let VoteOutcome {
        suggestion,
        just_completed,
        prediction_update,
    } = outcome;
    Ok(Json(VoteResponse {
        deduction: prediction_update.map(|u| u.deduction),
        predicted_amount: prediction_update.map(|u| u.new_amount),
        suggestion,
        just_completed,
    }))
}

/// Notify subscribers of a vote and any prediction change
fn broadcast_vote(state: &AppState, outcome: &VoteOutcome) {
    let now = chrono::Utc::now();
    state.shared.broadcast_event(HuddleEvent::SuggestionUpdated {
        event_id: outcome.suggestion.event_id,
        suggestion_id: outcome.suggestion.id,
        votes: outcome.suggestion.votes,
        is_completed: outcome.suggestion.is_completed,
        timestamp: now,
    });

    if let Some(update) = outcome.prediction_update {
        state
            .shared
            .broadcast_event(HuddleEvent::PredictedAmountChanged {
                event_id: outcome.suggestion.event_id,
                amount: update.new_amount,
                deduction: update.deduction,
                timestamp: now,
            });
    }
}

// ============================================================================
// SSE Endpoints
// ============================================================================

/// GET /api/v1/events - Change-notification stream
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    sse::event_stream(&state.shared)
}

/// POST /api/v1/coach/chat - Run a coach exchange, relayed as SSE
///
/// Any exchange already in progress is superseded: its task is aborted and
/// its playback session releases the sink before the new one takes over.
pub async fn coach_chat(
    State(state): State<AppState>,
    Json(request): Json<CoachChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("coach chat requested for board {}", request.board_id);

    let (relay_tx, relay_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_exchange(
        Arc::clone(&state.coach),
        request,
        Arc::clone(&state.shared),
        relay_tx,
    ));
    state.shared.begin_coach_exchange(handle);

    sse::coach_relay_stream(relay_rx)
}
