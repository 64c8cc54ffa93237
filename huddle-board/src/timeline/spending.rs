//! Weekly spending aggregation
//!
//! Buckets event spend into 7-day windows along the timeline axis. Weeks at
//! or before the week containing "today" count as actual spend; later weeks
//! count as predicted.

use super::layout::LayoutParams;
use huddle_common::models::EventRecord;
use serde::Serialize;

/// Lower bound for the chart's value scale, so sparse data keeps a usable axis
const MIN_SCALE_VALUE: f64 = 50.0;

/// One weekly bucket positioned at the center of its 7-day window
#[derive(Debug, Clone, Serialize)]
pub struct SpendPoint {
    /// Horizontal position (center of the week)
    pub x: f64,
    /// Spend for weeks up to and including the current week
    pub actual: f64,
    /// Spend for weeks after the current week
    pub predicted: f64,
    /// Label of the week's first day, e.g. "Nov 1"
    pub week_label: String,
}

/// Weekly buckets plus the maximum bucket value for scaling
#[derive(Debug, Clone, Serialize)]
pub struct WeeklySpending {
    pub points: Vec<SpendPoint>,
    pub max_value: f64,
}

/// Aggregate event spend into weekly buckets over the timeline horizon
///
/// Events with no spend are skipped; events outside the horizon are ignored.
pub fn weekly_spending(events: &[EventRecord], params: &LayoutParams) -> WeeklySpending {
    let week_count = (params.horizon_days as usize).div_ceil(7);
    let mut buckets = vec![0.0_f64; week_count];

    for event in events {
        if event.total_spent <= 0.0 {
            continue;
        }
        let days = (event.start_time.date_naive() - params.reference_date).num_days();
        if days < 0 {
            continue;
        }
        let idx = (days / 7) as usize;
        if idx < week_count {
            buckets[idx] += event.total_spent;
        }
    }

    let today_week = (params.today - params.reference_date).num_days() / 7;
    let mut max_value: f64 = 0.0;

    let points = buckets
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            max_value = max_value.max(value);
            let week_start =
                params.reference_date + chrono::Days::new(i as u64 * 7);
            let past = (i as i64) <= today_week;
            SpendPoint {
                x: i as f64 * 7.0 * params.day_width + 3.5 * params.day_width,
                actual: if past { value } else { 0.0 },
                predicted: if past { 0.0 } else { value },
                week_label: week_start.format("%b %-d").to_string(),
            }
        })
        .collect();

    WeeklySpending {
        points,
        max_value: max_value.max(MIN_SCALE_VALUE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn spent_event(year: i32, month: u32, day: u32, spent: f64) -> EventRecord {
        EventRecord {
            id: Uuid::new_v4(),
            board_id: Uuid::new_v4(),
            title: "spend".to_string(),
            description: None,
            start_time: Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap(),
            end_time: None,
            location: None,
            event_type: None,
            predicted_amount: None,
            total_spent: spent,
        }
    }

    #[test]
    fn test_empty_events_produce_floor_scale() {
        let spending = weekly_spending(&[], &LayoutParams::default());

        assert_eq!(spending.points.len(), 53); // ceil(365 / 7)
        assert_eq!(spending.max_value, MIN_SCALE_VALUE);
        assert!(spending.points.iter().all(|p| p.actual == 0.0 && p.predicted == 0.0));
    }

    #[test]
    fn test_same_week_events_accumulate() {
        let params = LayoutParams::default();
        let events = vec![
            spent_event(2025, 11, 2, 30.0),
            spent_event(2025, 11, 4, 45.0),
        ];

        let spending = weekly_spending(&events, &params);
        assert_eq!(spending.points[0].actual, 75.0);
        assert_eq!(spending.points[0].predicted, 0.0);
        assert_eq!(spending.max_value, 75.0);
    }

    #[test]
    fn test_past_and_future_split_around_today() {
        let params = LayoutParams::default();
        // Nov 2025 is well before today (Mar 1 2026); Jun 2026 is after.
        let events = vec![
            spent_event(2025, 11, 2, 120.0),
            spent_event(2026, 6, 10, 200.0),
        ];

        let spending = weekly_spending(&events, &params);
        let past = &spending.points[0];
        assert_eq!(past.actual, 120.0);
        assert_eq!(past.predicted, 0.0);

        let future_idx = (days_from_reference(2026, 6, 10, &params) / 7) as usize;
        let future = &spending.points[future_idx];
        assert_eq!(future.actual, 0.0);
        assert_eq!(future.predicted, 200.0);
    }

    #[test]
    fn test_zero_spend_events_skipped() {
        let spending = weekly_spending(
            &[spent_event(2025, 11, 2, 0.0)],
            &LayoutParams::default(),
        );
        assert_eq!(spending.points[0].actual, 0.0);
    }

    #[test]
    fn test_bucket_positions_center_on_week() {
        let params = LayoutParams::default();
        let spending = weekly_spending(&[], &params);

        assert_eq!(spending.points[0].x, 3.5 * params.day_width);
        assert_eq!(
            spending.points[1].x,
            7.0 * params.day_width + 3.5 * params.day_width
        );
        assert_eq!(spending.points[0].week_label, "Nov 1");
    }

    fn days_from_reference(year: i32, month: u32, day: u32, params: &LayoutParams) -> i64 {
        (chrono::NaiveDate::from_ymd_opt(year, month, day).unwrap() - params.reference_date)
            .num_days()
    }
}
