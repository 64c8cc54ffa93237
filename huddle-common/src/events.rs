//! Event types for the Huddle Up change-notification system
//!
//! Mutating store operations broadcast these events; clients subscribe over
//! SSE instead of polling the store on a timer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Huddle Up event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HuddleEvent {
    /// A board record changed
    BoardChanged {
        board_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The event set of a board changed
    EventsChanged {
        board_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transactions linked to an event changed
    TransactionsChanged {
        event_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A suggestion was voted on or completed
    SuggestionUpdated {
        event_id: Uuid,
        suggestion_id: i64,
        votes: i64,
        is_completed: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An event's predicted spend was reduced by an adopted suggestion
    PredictedAmountChanged {
        event_id: Uuid,
        amount: f64,
        deduction: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Coach exchange status transition
    CoachStatusChanged {
        status: CoachStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Coach exchange status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoachStatus {
    /// No exchange in progress
    Idle,
    /// Waiting for the coaching backend to respond
    Processing,
    /// Streaming audio playback in progress
    Playing,
}

impl HuddleEvent {
    /// Event name used as the SSE event type
    pub fn event_name(&self) -> &'static str {
        match self {
            HuddleEvent::BoardChanged { .. } => "BoardChanged",
            HuddleEvent::EventsChanged { .. } => "EventsChanged",
            HuddleEvent::TransactionsChanged { .. } => "TransactionsChanged",
            HuddleEvent::SuggestionUpdated { .. } => "SuggestionUpdated",
            HuddleEvent::PredictedAmountChanged { .. } => "PredictedAmountChanged",
            HuddleEvent::CoachStatusChanged { .. } => "CoachStatusChanged",
        }
    }
}
