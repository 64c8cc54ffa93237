//! Data store access
//!
//! SQLite-backed store for boards, events, transactions, and suggestions.
//! Handlers go through the [`Store`] handle; mutations are broadcast as
//! change notifications by the API layer so clients never poll.

pub mod boards;
pub mod events;
pub mod init;
pub mod suggestions;
pub mod transactions;

pub use init::init_database;
pub use suggestions::{PredictionUpdate, VoteOutcome};

use huddle_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Data store handle
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Parse a TEXT uuid column
pub(crate) fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("invalid uuid in database: {e}")))
}
