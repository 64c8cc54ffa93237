//! # Huddle Up Common Library
//!
//! Shared code for the Huddle Up services including:
//! - Domain models (boards, events, transactions, suggestions)
//! - Event types (HuddleEvent enum)
//! - Configuration types
//! - Error types

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
