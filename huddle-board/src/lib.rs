//! # Huddle Up Board Service Library (huddle-board)
//!
//! Board, event, and spending service for Huddle Up.
//!
//! **Purpose:** Serve board/event/transaction/suggestion data over HTTP,
//! compute the timeline row-packing layout and weekly spending aggregation,
//! run voice coach exchanges against the external coaching backend, and push
//! change notifications to clients over SSE.
//!
//! **Architecture:** Single-process axum service over SQLite, with an
//! ordered streaming assembler feeding coach audio to the caller.

pub mod api;
pub mod coach;
pub mod config;
pub mod db;
pub mod state;
pub mod timeline;

pub use huddle_common::{Error, Result};
pub use state::SharedState;
