//! crates/festival_planner_core/src/calendar.rs
//!
//! The date/filter engine: calendar indicator days and the per-day event list.
//! All comparisons are on naive local calendar dates, inclusive on both ends.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;

use crate::domain::{date_in_month, DateSelection, Event};

/// Number of days in a zero-based month, or 0 for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = date_in_month(year, month, 1) else {
        return 0;
    };
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, first.month() + 1, 1)
    };
    next.map(|n| n.signed_duration_since(first).num_days() as u32)
        .unwrap_or(31)
}

/// Days of the displayed month covered by at least one event.
pub fn active_days(events: &[Event], year: i32, month: u32) -> BTreeSet<u32> {
    let mut days = BTreeSet::new();
    for day in 1..=days_in_month(year, month) {
        let Some(date) = date_in_month(year, month, day) else {
            continue;
        };
        if events.iter().any(|event| event.is_active_on(date)) {
            days.insert(day);
        }
    }
    days
}

/// Case-insensitive substring match over title and location.
/// A blank query matches everything.
pub fn matches_query(event: &Event, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    event.title.to_lowercase().contains(&needle) || event.location.to_lowercase().contains(&needle)
}

/// Events active on the selected day, narrowed by the search query.
pub fn displayed_events<'a>(
    events: &'a [Event],
    selection: &DateSelection,
    query: &str,
) -> Vec<&'a Event> {
    let Some(date) = selection.date() else {
        return Vec::new();
    };
    events
        .iter()
        .filter(|event| event.is_active_on(date) && matches_query(event, query))
        .collect()
}

/// Events running on one date, e.g. "today" for the city map.
pub fn events_on(events: &[Event], date: NaiveDate) -> Vec<&Event> {
    events.iter().filter(|event| event.is_active_on(date)).collect()
}

/// Whether an event's range touches any day of a zero-based month.
pub fn overlaps_month(event: &Event, year: i32, month: u32) -> bool {
    let Some(first) = date_in_month(year, month, 1) else {
        return false;
    };
    let Some(last) = date_in_month(year, month, days_in_month(year, month)) else {
        return false;
    };
    event.date_start <= last && event.date_end >= first
}

/// First day of the month before the given date's month.
pub fn first_of_previous_month(date: NaiveDate) -> NaiveDate {
    let selection = DateSelection::from_date(date).previous_month();
    date_in_month(selection.year, selection.month, 1).unwrap_or(date)
}
