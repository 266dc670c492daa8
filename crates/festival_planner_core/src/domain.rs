//! crates/festival_planner_core/src/domain.rs
//!
//! Defines the core data structures of the festival planner.
//! Events serialize in camelCase because that is the shape persisted in
//! device storage and stored inside remote schedule rows.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Events
//=========================================================================================

/// The two partitions events are browsed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Performances and exhibitions (art, music, theater).
    Performance,
    /// Festivals and events (fireworks, outdoor, community).
    Festival,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Performance, Category::Festival];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Performance => "PERFORMANCE",
            Category::Festival => "FESTIVAL",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Performance => "Performance / Exhibition",
            Category::Festival => "Festival / Event",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PERFORMANCE" => Ok(Category::Performance),
            "FESTIVAL" => Ok(Category::Festival),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingLot {
    pub name: String,
    /// e.g. public, private, paid.
    #[serde(rename = "type")]
    pub kind: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusStop {
    pub stop_name: String,
    #[serde(default)]
    pub routes: Vec<String>,
}

/// Parking, subway and bus information around a venue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportInfo {
    #[serde(default)]
    pub parking: Vec<ParkingLot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subway: Option<String>,
    #[serde(default)]
    pub bus: Vec<BusStop>,
}

impl TransportInfo {
    pub const NO_INFORMATION: &'static str = "No information";

    /// The placeholder returned when no transport source can be consulted.
    pub fn unavailable() -> Self {
        Self {
            parking: Vec::new(),
            subway: Some(Self::NO_INFORMATION.to_string()),
            bus: Vec::new(),
        }
    }

    /// True when the structure carries nothing a visitor could act on.
    pub fn is_empty(&self) -> bool {
        let no_subway = match self.subway.as_deref() {
            None => true,
            Some(s) => s.trim().is_empty() || s == Self::NO_INFORMATION,
        };
        self.parking.is_empty() && self.bus.is_empty() && no_subway
    }
}

/// A cultural happening with an inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub location: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub category: Category,
    pub description: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportInfo>,
}

impl Event {
    /// Inclusive, date-only range test.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.date_start <= date && date <= self.date_end
    }

    /// An event is well-formed when its range is not inverted.
    pub fn has_valid_range(&self) -> bool {
        self.date_start <= self.date_end
    }
}

//=========================================================================================
// Date Selection
//=========================================================================================

/// Calendar date for a zero-based month. `None` for months outside 0..=11 or days
/// outside the month.
pub fn date_in_month(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if month > 11 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month + 1, day)
}

/// The day currently being viewed. `month` is zero-based (0 = January).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSelection {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DateSelection {
    /// Builds a selection, rejecting months outside 0..=11 and days outside the month.
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        date_in_month(year, month, day)?;
        Some(Self { year, month, day })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month0(),
            day: date.day(),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        date_in_month(self.year, self.month, self.day)
    }

    /// Same period, different day.
    pub fn with_day(&self, day: u32) -> Option<Self> {
        Self::new(self.year, self.month, day)
    }

    pub fn previous_month(&self) -> Self {
        if self.month == 0 {
            Self { year: self.year - 1, month: 11, day: 1 }
        } else {
            Self { year: self.year, month: self.month - 1, day: 1 }
        }
    }

    pub fn next_month(&self) -> Self {
        if self.month == 11 {
            Self { year: self.year + 1, month: 0, day: 1 }
        } else {
            Self { year: self.year, month: self.month + 1, day: 1 }
        }
    }

    pub fn same_period(&self, other: &DateSelection) -> bool {
        self.year == other.year && self.month == other.month
    }
}

//=========================================================================================
// Identity and Accounts
//=========================================================================================

/// The opaque authenticated identity of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
}

/// Represents a user - used throughout app.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// A browser login session (auth cookie).
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Remote Schedule Rows
//=========================================================================================

/// One saved event owned by one user in the remote store.
#[derive(Debug, Clone)]
pub struct ScheduleRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_data: Event,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("festival".parse::<Category>(), Ok(Category::Festival));
        assert_eq!(" Performance ".parse::<Category>(), Ok(Category::Performance));
        assert!("concert".parse::<Category>().is_err());
    }

    #[test]
    fn selection_rejects_impossible_days() {
        assert!(DateSelection::new(2025, 1, 29).is_none());
        assert!(DateSelection::new(2024, 1, 29).is_some());
        assert!(DateSelection::new(2025, 12, 1).is_none());
        assert!(DateSelection::new(2025, 10, 0).is_none());
        assert!(DateSelection::new(2025, u32::MAX, 1).is_none());
    }

    #[test]
    fn month_navigation_wraps_years_and_resets_day() {
        let sel = DateSelection::new(2025, 0, 20).unwrap();
        assert_eq!(sel.previous_month(), DateSelection { year: 2024, month: 11, day: 1 });
        let sel = DateSelection::new(2025, 11, 31).unwrap();
        assert_eq!(sel.next_month(), DateSelection { year: 2026, month: 0, day: 1 });
    }

    #[test]
    fn event_uses_camel_case_wire_names() {
        let json = r#"{
            "id": "7",
            "title": "Jazz Night",
            "location": "BEXCO",
            "dateStart": "2025-11-15",
            "dateEnd": "2025-11-17",
            "category": "PERFORMANCE",
            "description": "",
            "imageUrl": "https://img.example/7.jpg",
            "transport": { "bus": [{ "stopName": "Centum", "routes": ["40"] }] }
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.date_end, NaiveDate::from_ymd_opt(2025, 11, 17).unwrap());
        let transport = event.transport.as_ref().unwrap();
        assert_eq!(transport.bus[0].stop_name, "Centum");
        assert!(transport.parking.is_empty());

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["dateStart"], "2025-11-15");
        assert!(back.get("price").is_none());
    }

    #[test]
    fn placeholder_transport_counts_as_empty() {
        assert!(TransportInfo::unavailable().is_empty());
        assert!(TransportInfo::default().is_empty());
        let info = TransportInfo {
            subway: Some("Line 2 Centum City".into()),
            ..Default::default()
        };
        assert!(!info.is_empty());
    }
}
