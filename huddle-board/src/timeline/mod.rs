//! Timeline computation for board events
//!
//! Pure, synchronous derivations over an event set: the row-packing card
//! layout and the weekly spending aggregation. Both are recomputed in full
//! whenever the input event set changes; nothing here is incremental.

pub mod layout;
pub mod spending;

pub use layout::{layout_timeline, DateGroup, LayoutParams, TimelineLayout};
pub use spending::{weekly_spending, SpendPoint, WeeklySpending};
