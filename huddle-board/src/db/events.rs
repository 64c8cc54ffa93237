//! Event queries
//!
//! Events are served with their spend totals aggregated from linked
//! transactions in a single query.

use super::{parse_uuid, Store};
use chrono::{DateTime, Utc};
use huddle_common::models::EventRecord;
use huddle_common::Result;
use tracing::debug;
use uuid::Uuid;

type EventRow = (
    String,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<String>,
    Option<String>,
    Option<f64>,
    f64,
);

fn into_event(row: EventRow) -> Result<EventRecord> {
    let (
        id,
        board_id,
        title,
        description,
        start_time,
        end_time,
        location,
        event_type,
        predicted_amount,
        total_spent,
    ) = row;
    Ok(EventRecord {
        id: parse_uuid(&id)?,
        board_id: parse_uuid(&board_id)?,
        title,
        description,
        start_time,
        end_time,
        location,
        event_type,
        predicted_amount,
        total_spent,
    })
}

impl Store {
    /// Fetch all events of a board, newest first, with spend totals
    pub async fn list_events(&self, board_id: Uuid) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT e.id, e.board_id, e.title, e.description, e.start_time, e.end_time,
                   e.location, e.event_type, e.predicted_amount,
                   COALESCE(SUM(t.amount), 0.0) AS total_spent
            FROM events e
            LEFT JOIN transactions t ON t.event_id = e.id
            WHERE e.board_id = ?
            GROUP BY e.id
            ORDER BY e.start_time DESC
            "#,
        )
        .bind(board_id.to_string())
        .fetch_all(self.pool())
        .await?;

        debug!("loaded {} events for board {}", rows.len(), board_id);
        rows.into_iter().map(into_event).collect()
    }

    /// Fetch one event with its spend total
    pub async fn get_event(&self, event_id: Uuid) -> Result<Option<EventRecord>> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT e.id, e.board_id, e.title, e.description, e.start_time, e.end_time,
                   e.location, e.event_type, e.predicted_amount,
                   COALESCE(SUM(t.amount), 0.0) AS total_spent
            FROM events e
            LEFT JOIN transactions t ON t.event_id = e.id
            WHERE e.id = ?
            GROUP BY e.id
            "#,
        )
        .bind(event_id.to_string())
        .fetch_optional(self.pool())
        .await?;

        row.map(into_event).transpose()
    }

    /// Overwrite an event's predicted spend
    pub async fn update_predicted_amount(&self, event_id: Uuid, amount: f64) -> Result<()> {
        sqlx::query("UPDATE events SET predicted_amount = ? WHERE id = ?")
            .bind(amount)
            .bind(event_id.to_string())
            .execute(self.pool())
            .await?;

        debug!("updated predicted amount of event {} to {}", event_id, amount);
        Ok(())
    }
}
