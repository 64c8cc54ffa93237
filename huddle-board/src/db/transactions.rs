//! Transaction queries

use super::{parse_uuid, Store};
use chrono::{DateTime, Utc};
use huddle_common::models::Transaction;
use huddle_common::Result;
use uuid::Uuid;

impl Store {
    /// Fetch the transactions linked to an event, largest first
    pub async fn list_transactions(&self, event_id: Uuid) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, (
            String,
            String,
            f64,
            Option<String>,
            Option<String>,
            DateTime<Utc>,
        )>(
            r#"
            SELECT id, event_id, amount, category, merchant, transaction_date
            FROM transactions
            WHERE event_id = ?
            ORDER BY amount DESC
            "#,
        )
        .bind(event_id.to_string())
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|(id, event_id, amount, category, merchant, transaction_date)| {
                Ok(Transaction {
                    id: parse_uuid(&id)?,
                    event_id: parse_uuid(&event_id)?,
                    amount,
                    category,
                    merchant,
                    transaction_date,
                })
            })
            .collect()
    }
}
