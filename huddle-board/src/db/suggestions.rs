//! Suggestion queries and the voting state machine
//!
//! A suggestion completes once it collects the policy's vote threshold; on
//! completion, a configured fraction of its potential savings is deducted
//! from the owning event's predicted spend, clamped at zero.

use super::{parse_uuid, Store};
use huddle_common::config::SavingsPolicy;
use huddle_common::models::Suggestion;
use huddle_common::{Error, Result};
use tracing::{debug, info};
use uuid::Uuid;

type SuggestionRow = (
    i64,
    String,
    Option<String>,
    Option<String>,
    Option<f64>,
    Option<f64>,
    i64,
    bool,
    bool,
);

fn into_suggestion(row: SuggestionRow) -> Result<Suggestion> {
    let (
        id,
        event_id,
        suggestion,
        explanation,
        potential_savings,
        confidence,
        votes,
        is_completed,
        confetti_shown,
    ) = row;
    Ok(Suggestion {
        id,
        event_id: parse_uuid(&event_id)?,
        suggestion,
        explanation,
        potential_savings,
        confidence,
        votes,
        is_completed,
        confetti_shown,
    })
}

const SUGGESTION_COLUMNS: &str = "id, event_id, suggestion, explanation, potential_savings, \
                                  confidence, votes, is_completed, confetti_shown";

/// Predicted-amount change caused by an adopted suggestion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionUpdate {
    pub deduction: f64,
    pub new_amount: f64,
}

/// Result of one vote
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    /// The suggestion after the vote
    pub suggestion: Suggestion,
    /// This vote pushed the suggestion over the threshold
    pub just_completed: bool,
    /// Set when completion reduced the owning event's prediction
    pub prediction_update: Option<PredictionUpdate>,
}

impl Store {
    /// Fetch the suggestions for an event, active first, most-voted first
    pub async fn list_suggestions(&self, event_id: Uuid) -> Result<Vec<Suggestion>> {
        let rows = sqlx::query_as::<_, SuggestionRow>(&format!(
            "SELECT {SUGGESTION_COLUMNS} FROM suggestions \
             WHERE event_id = ? \
             ORDER BY is_completed ASC, votes DESC"
        ))
        .bind(event_id.to_string())
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(into_suggestion).collect()
    }

    /// Fetch one suggestion by id
    pub async fn get_suggestion(&self, suggestion_id: i64) -> Result<Option<Suggestion>> {
        let row = sqlx::query_as::<_, SuggestionRow>(&format!(
            "SELECT {SUGGESTION_COLUMNS} FROM suggestions WHERE id = ?"
        ))
        .bind(suggestion_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(into_suggestion).transpose()
    }

    /// Apply one vote to a suggestion
    ///
    /// Votes on completed suggestions are ignored. Crossing the threshold
    /// marks the suggestion completed and deducts the policy fraction of its
    /// potential savings from the event's predicted amount, clamped at zero.
    pub async fn vote_suggestion(
        &self,
        suggestion_id: i64,
        policy: &SavingsPolicy,
    ) -> Result<VoteOutcome> {
        let mut suggestion = self
            .get_suggestion(suggestion_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("suggestion {suggestion_id}")))?;

        if suggestion.is_completed {
            debug!("ignoring vote on completed suggestion {}", suggestion_id);
            return Ok(VoteOutcome {
                suggestion,
                just_completed: false,
                prediction_update: None,
            });
        }

        suggestion.votes += 1;
        let just_completed = suggestion.votes >= policy.vote_threshold;
        if just_completed {
            suggestion.is_completed = true;
            suggestion.confetti_shown = true;
        }

        sqlx::query(
            "UPDATE suggestions SET votes = ?, is_completed = ?, confetti_shown = ? WHERE id = ?",
        )
        .bind(suggestion.votes)
        .bind(suggestion.is_completed)
        .bind(suggestion.confetti_shown)
        .bind(suggestion_id)
        .execute(self.pool())
        .await?;

        let mut prediction_update = None;
        if just_completed {
            info!(
                "suggestion {} adopted for event {}",
                suggestion_id, suggestion.event_id
            );
            if let Some(savings) = suggestion.potential_savings.filter(|s| *s > 0.0) {
                prediction_update = self
                    .apply_savings(suggestion.event_id, policy.deduction(savings))
                    .await?;
            }
        }

        Ok(VoteOutcome {
            suggestion,
            just_completed,
            prediction_update,
        })
    }

    /// Deduct an adopted suggestion's savings from the event prediction
    ///
    /// Events without a predicted amount are left untouched.
    async fn apply_savings(
        &self,
        event_id: Uuid,
        deduction: f64,
    ) -> Result<Option<PredictionUpdate>> {
        let current: Option<(Option<f64>,)> =
            sqlx::query_as("SELECT predicted_amount FROM events WHERE id = ?")
                .bind(event_id.to_string())
                .fetch_optional(self.pool())
                .await?;

        let Some((Some(current_amount),)) = current else {
            return Ok(None);
        };

        let new_amount = (current_amount - deduction).max(0.0);
        self.update_predicted_amount(event_id, new_amount).await?;

        Ok(Some(PredictionUpdate {
            deduction,
            new_amount,
        }))
    }
}
