//! Domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A themed board grouping calendar events and their spending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    /// Board flavor ("work", "personal", "friend", "spouse")
    #[serde(rename = "type")]
    pub kind: String,
    pub goal_description: Option<String>,
    pub goal_target_amount: Option<f64>,
}

/// A calendar event attached to a board
///
/// `total_spent` is derived from linked transactions, not stored on the
/// events table itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub board_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub event_type: Option<String>,
    pub predicted_amount: Option<f64>,
    pub total_spent: f64,
}

/// A transaction linked to an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub event_id: Uuid,
    pub amount: f64,
    pub category: Option<String>,
    pub merchant: Option<String>,
    pub transaction_date: DateTime<Utc>,
}

/// A crowd-sourced spending suggestion attached to an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: i64,
    pub event_id: Uuid,
    pub suggestion: Option<String>,
    pub explanation: Option<String>,
    pub potential_savings: Option<f64>,
    pub confidence: Option<f64>,
    pub votes: i64,
    pub is_completed: bool,
    pub confetti_shown: bool,
}
