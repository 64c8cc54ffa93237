//! Timeline row-packing layout
//!
//! Groups same-day events and assigns each group a vertical row so that no
//! two groups' rendered footprints overlap horizontally. Greedy first-fit
//! over groups sorted by anchor position: correct for the no-overlap
//! invariant and deterministic for a given input set, though not globally
//! optimal in row count for pathological inputs.

use chrono::NaiveDate;
use huddle_common::models::EventRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Layout tuning constants
///
/// Horizontal positions are derived from elapsed days since
/// `reference_date`, scaled by `day_width`. A group's footprint is
/// `card_width + card_gap` wide, centered on its anchor, regardless of how
/// many events the day holds; only the group's height grows with the event
/// count.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutParams {
    /// Left edge of the timeline (day 0)
    pub reference_date: NaiveDate,
    /// Number of days spanned by the timeline
    pub horizon_days: i64,
    /// The date treated as "today" when splitting actual from predicted
    pub today: NaiveDate,
    /// Pixels per day along the time axis
    pub day_width: f64,
    /// Rendered card width
    pub card_width: f64,
    /// Horizontal gap between adjacent cards
    pub card_gap: f64,
    /// Height of the date label above a group's card stack
    pub label_height: f64,
    /// Height of one rendered event card
    pub card_height: f64,
    /// Minimum height of a group footprint
    pub min_group_height: f64,
    /// Vertical padding added to each row
    pub row_padding: f64,
    /// Baseline padding of the card area
    pub area_padding: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            reference_date: NaiveDate::from_ymd_opt(2025, 11, 1).expect("valid date"),
            horizon_days: 365,
            today: NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date"),
            day_width: 18.0,
            card_width: 148.0,
            card_gap: 12.0,
            label_height: 20.0,
            card_height: 82.0,
            min_group_height: 100.0,
            row_padding: 8.0,
            area_padding: 20.0,
        }
    }
}

impl LayoutParams {
    /// Horizontal anchor position for a calendar date
    pub fn anchor_x(&self, date: NaiveDate) -> f64 {
        (date - self.reference_date).num_days() as f64 * self.day_width
    }

    /// Width of one group footprint (card plus gap)
    pub fn footprint_width(&self) -> f64 {
        self.card_width + self.card_gap
    }

    /// Total pixel width of the time axis
    pub fn total_width(&self) -> f64 {
        self.horizon_days as f64 * self.day_width
    }
}

/// All events sharing one calendar date, with an assigned row
#[derive(Debug, Clone, Serialize)]
pub struct DateGroup {
    /// Calendar date shared by all events in the group
    pub date: NaiveDate,
    /// Horizontal anchor position (center of the footprint)
    pub anchor_x: f64,
    /// Assigned row index (0-based)
    pub row: usize,
    /// Events on this date, sorted by start time ascending
    pub events: Vec<EventRecord>,
}

/// Complete derived layout for an event set
#[derive(Debug, Clone, Serialize)]
pub struct TimelineLayout {
    /// Date groups with row assignments, in ascending anchor order
    pub groups: Vec<DateGroup>,
    /// Number of rows used
    pub row_count: usize,
    /// Uniform row height, sized to the tallest group
    pub row_height: f64,
    /// Total height of the card area
    pub area_height: f64,
}

/// Compute the row-packed layout for an event set
///
/// Empty input yields zero groups, zero rows, and the baseline area height.
pub fn layout_timeline(events: &[EventRecord], params: &LayoutParams) -> TimelineLayout {
    let mut groups = group_by_date(events, params);

    // Ascending anchor; distinct dates can share an anchor only if day_width
    // is zero, in which case the stable sort preserves date-key order.
    groups.sort_by(|a, b| a.anchor_x.total_cmp(&b.anchor_x));

    assign_rows(&mut groups, params.footprint_width());

    let row_count = groups.iter().map(|g| g.row + 1).max().unwrap_or(0);
    let row_height = row_height(&groups, params);
    let area_height = row_count as f64 * row_height + params.area_padding;

    TimelineLayout {
        groups,
        row_count,
        row_height,
        area_height,
    }
}

/// Bucket events by the calendar date of their start time
///
/// Within a group, events are sorted by start time ascending. Two events on
/// the same day always land in one group, never two groups at the same
/// position.
fn group_by_date(events: &[EventRecord], params: &LayoutParams) -> Vec<DateGroup> {
    let mut by_date: BTreeMap<NaiveDate, Vec<EventRecord>> = BTreeMap::new();
    for event in events {
        by_date
            .entry(event.start_time.date_naive())
            .or_default()
            .push(event.clone());
    }

    by_date
        .into_iter()
        .map(|(date, mut evts)| {
            evts.sort_by_key(|e| e.start_time);
            DateGroup {
                date,
                anchor_x: params.anchor_x(date),
                row: 0,
                events: evts,
            }
        })
        .collect()
}

/// First-fit row assignment over groups in ascending anchor order
///
/// Tracks the rightmost occupied edge per row; a group goes to the first
/// row whose edge does not reach past the group's left edge, else opens a
/// new row.
fn assign_rows(groups: &mut [DateGroup], footprint_width: f64) {
    let half = footprint_width / 2.0;
    let mut row_edges: Vec<f64> = Vec::new();

    for group in groups.iter_mut() {
        let left = group.anchor_x - half;

        match row_edges.iter().position(|&edge| edge <= left) {
            Some(row) => {
                group.row = row;
                row_edges[row] = group.anchor_x + half;
            }
            None => {
                group.row = row_edges.len();
                row_edges.push(group.anchor_x + half);
            }
        }
    }
}

/// Uniform row height accommodating the tallest group
fn row_height(groups: &[DateGroup], params: &LayoutParams) -> f64 {
    let tallest = groups
        .iter()
        .map(|g| params.label_height + g.events.len() as f64 * params.card_height)
        .fold(params.min_group_height, f64::max);
    tallest + params.row_padding
}
