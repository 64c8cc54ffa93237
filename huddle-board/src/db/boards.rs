//! Board queries

use super::{parse_uuid, Store};
use huddle_common::models::Board;
use huddle_common::Result;
use uuid::Uuid;

impl Store {
    /// Fetch a board by id
    pub async fn get_board(&self, board_id: Uuid) -> Result<Option<Board>> {
        let row = sqlx::query_as::<_, (String, String, String, Option<String>, Option<f64>)>(
            r#"
            SELECT id, name, type, goal_description, goal_target_amount
            FROM boards
            WHERE id = ?
            "#,
        )
        .bind(board_id.to_string())
        .fetch_optional(self.pool())
        .await?;

        row.map(|(id, name, kind, goal_description, goal_target_amount)| {
            Ok(Board {
                id: parse_uuid(&id)?,
                name,
                kind,
                goal_description,
                goal_target_amount,
            })
        })
        .transpose()
    }
}
