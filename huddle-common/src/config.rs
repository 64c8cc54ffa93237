//! Configuration types
//!
//! Product constants live here rather than inline in the logic that uses
//! them. The suggestion-adoption numbers in particular are tunable policy,
//! not derived from any modeled relationship.

use serde::{Deserialize, Serialize};

/// Policy for adopting crowd-sourced spending suggestions
///
/// A suggestion completes once it collects `vote_threshold` votes; on
/// completion, `savings_fraction` of its potential savings is deducted from
/// the owning event's predicted spend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsPolicy {
    pub vote_threshold: i64,
    pub savings_fraction: f64,
}

impl Default for SavingsPolicy {
    fn default() -> Self {
        Self {
            vote_threshold: 3,
            savings_fraction: 0.5,
        }
    }
}

impl SavingsPolicy {
    /// Deduction applied to an event's predicted amount when a suggestion
    /// with the given potential savings completes
    pub fn deduction(&self, potential_savings: f64) -> f64 {
        potential_savings * self.savings_fraction
    }
}
