//! services/api/src/web/view.rs
//!
//! Renders a `ViewController` into the snapshot the browser draws from. A snapshot is
//! sent after every state change, so the client never has to derive anything itself.

use chrono::{Days, NaiveDate};
use festival_planner_core::{
    catalog::CITY_CENTER,
    controller::{TransportDisplay, View, ViewController},
    domain::{Category, Coordinates, DateSelection, Event, TransportInfo},
};
use reqwest::Url;
use serde::Serialize;

const CALENDAR_TEMPLATE_URL: &str = "https://calendar.google.com/calendar/render";

#[derive(Serialize, Debug)]
pub struct Snapshot {
    pub view: View,
    pub category: Category,
    pub category_label: &'static str,
    pub selection: DateSelection,
    pub search: String,
    pub loading: bool,
    /// Saving is disabled until the saved list has loaded.
    pub schedule_loading: bool,
    pub signed_in: bool,
    /// Bumped by top-level navigation; the client scrolls to the top when it changes.
    pub scroll_epoch: u64,
    pub saved_ids: Vec<String>,
    pub body: ViewBody,
}

#[derive(Serialize, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewBody {
    List {
        active_days: Vec<u32>,
        events: Vec<EventCard>,
        result_count: usize,
        searching: bool,
    },
    Detail {
        event: Event,
        saved: bool,
        transport: TransportView,
        transport_loading: bool,
        calendar_link: String,
    },
    Map {
        center: Coordinates,
        markers: Vec<MapMarker>,
        count: usize,
    },
    Ticket {
        events: Vec<Event>,
    },
    Schedule {
        events: Vec<ScheduleEntry>,
    },
}

#[derive(Serialize, Debug)]
pub struct EventCard {
    #[serde(flatten)]
    pub event: Event,
    pub saved: bool,
}

#[derive(Serialize, Debug)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TransportView {
    Live { info: TransportInfo },
    Listed { info: TransportInfo },
    Unknown,
}

impl From<TransportDisplay> for TransportView {
    fn from(display: TransportDisplay) -> Self {
        match display {
            TransportDisplay::Live(info) => TransportView::Live { info },
            TransportDisplay::Listed(info) => TransportView::Listed { info },
            TransportDisplay::Unknown => TransportView::Unknown,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct MapMarker {
    pub id: String,
    pub title: String,
    pub location: String,
    pub coordinates: Coordinates,
}

#[derive(Serialize, Debug)]
pub struct ScheduleEntry {
    #[serde(flatten)]
    pub event: Event,
    /// Starts after today.
    pub upcoming: bool,
}

impl Snapshot {
    pub fn capture(controller: &ViewController, today: NaiveDate) -> Self {
        let mut saved_ids: Vec<String> = controller.saved_ids().into_iter().collect();
        saved_ids.sort();

        Self {
            view: controller.view(),
            category: controller.category(),
            category_label: controller.category().label(),
            selection: controller.selection(),
            search: controller.search().to_string(),
            loading: controller.is_loading(),
            schedule_loading: controller.is_schedule_loading(),
            signed_in: controller.session().is_some(),
            scroll_epoch: controller.scroll_epoch(),
            saved_ids,
            body: render_body(controller, today),
        }
    }
}

fn render_body(controller: &ViewController, today: NaiveDate) -> ViewBody {
    match controller.view() {
        View::List => list_body(controller),
        View::Detail => match controller.selected_event() {
            Some(event) => ViewBody::Detail {
                event: event.clone(),
                saved: controller.is_saved(&event.id),
                transport: controller.transport_display().into(),
                transport_loading: controller.transport_pending(),
                calendar_link: calendar_link(event),
            },
            None => list_body(controller),
        },
        View::Map => {
            let todays = controller.events_today(today);
            let markers = todays
                .iter()
                .filter_map(|event| {
                    event.coordinates.map(|coordinates| MapMarker {
                        id: event.id.clone(),
                        title: event.title.clone(),
                        location: event.location.clone(),
                        coordinates,
                    })
                })
                .collect();
            ViewBody::Map {
                center: CITY_CENTER,
                markers,
                count: todays.len(),
            }
        }
        View::Ticket => ViewBody::Ticket {
            events: controller.events().to_vec(),
        },
        View::Schedule => ViewBody::Schedule {
            events: controller
                .saved_events()
                .iter()
                .map(|event| ScheduleEntry {
                    event: event.clone(),
                    upcoming: event.date_start > today,
                })
                .collect(),
        },
    }
}

fn list_body(controller: &ViewController) -> ViewBody {
    let events: Vec<EventCard> = controller
        .displayed_events()
        .into_iter()
        .map(|event| EventCard {
            event: event.clone(),
            saved: controller.is_saved(&event.id),
        })
        .collect();
    ViewBody::List {
        active_days: controller.active_days().into_iter().collect(),
        result_count: events.len(),
        events,
        searching: !controller.search().trim().is_empty(),
    }
}

/// A Google Calendar "add event" link for an all-day range. The end date is exclusive.
pub fn calendar_link(event: &Event) -> String {
    let start = event.date_start.format("%Y%m%d").to_string();
    let end = event
        .date_end
        .checked_add_days(Days::new(1))
        .unwrap_or(event.date_end)
        .format("%Y%m%d")
        .to_string();
    let details = format!("{}\n\nLocation: {}", event.description, event.location);
    let dates = format!("{}/{}", start, end);
    match Url::parse_with_params(
        CALENDAR_TEMPLATE_URL,
        &[
            ("action", "TEMPLATE"),
            ("text", event.title.as_str()),
            ("dates", dates.as_str()),
            ("details", details.as_str()),
            ("location", event.location.as_str()),
        ],
    ) {
        Ok(url) => url.into(),
        Err(_) => CALENDAR_TEMPLATE_URL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use festival_planner_core::{
        domain::Identity,
        ports::{KeyValueStorage, PortResult, ScheduleRepository},
        schedule::SavedEventsStore,
        ScheduleRow,
    };
    use serde_json::Value;
    use std::sync::Arc;
    use uuid::Uuid;

    struct NoRemote;

    #[async_trait::async_trait]
    impl ScheduleRepository for NoRemote {
        async fn list_rows(&self, _user_id: Uuid) -> PortResult<Vec<ScheduleRow>> {
            Ok(Vec::new())
        }
        async fn insert_row(&self, _user_id: Uuid, _event: &Event) -> PortResult<()> {
            Ok(())
        }
        async fn delete_row(&self, _user_id: Uuid, _event_id: &str) -> PortResult<u64> {
            Ok(0)
        }
    }

    struct NoLocal;

    #[async_trait::async_trait]
    impl KeyValueStorage for NoLocal {
        async fn get_item(&self, _key: &str) -> PortResult<Option<String>> {
            Ok(None)
        }
        async fn set_item(&self, _key: &str, _value: &str) -> PortResult<()> {
            Ok(())
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn event(id: &str, title: &str, start: &str, end: &str, at: Option<Coordinates>) -> Event {
        Event {
            id: id.into(),
            title: title.into(),
            location: "Gwangalli".into(),
            date_start: date(start),
            date_end: date(end),
            category: Category::Festival,
            description: "Fireworks over the bridge".into(),
            image_url: "https://img.example/x.jpg".into(),
            price: None,
            cast: None,
            coordinates: at,
            transport: None,
        }
    }

    fn controller_with(events: Vec<Event>, today: NaiveDate) -> ViewController {
        let store = SavedEventsStore::new(Arc::new(NoRemote), Arc::new(NoLocal));
        let mut controller = ViewController::new(store, today, None);
        if let Some(request) = controller.request_events() {
            controller.finish_fetch(&request, events);
        }
        let load = controller.reload_schedule();
        controller.finish_schedule_load(&load, Vec::new());
        controller
    }

    const AT: Coordinates = Coordinates { lat: 35.15, lng: 129.11 };

    #[test]
    fn calendar_link_uses_an_exclusive_end_date() {
        let link = calendar_link(&event("1", "Fireworks", "2025-11-15", "2025-11-17", None));
        let url = Url::parse(&link).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("dates".into(), "20251115/20251118".into())));
        assert!(pairs.contains(&("text".into(), "Fireworks".into())));
        assert!(pairs.contains(&(
            "details".into(),
            "Fireworks over the bridge\n\nLocation: Gwangalli".into()
        )));
    }

    #[test]
    fn list_snapshot_flags_saved_events_and_days() {
        let today = date("2025-11-15");
        let mut controller = controller_with(
            vec![
                event("1", "Lantern Fest", "2025-11-15", "2025-11-17", None),
                event("2", "Jazz Night", "2025-11-20", "2025-11-20", None),
            ],
            today,
        );
        controller.toggle_save("1");

        let json = serde_json::to_value(Snapshot::capture(&controller, today)).unwrap();
        assert_eq!(json["view"], "list");
        assert_eq!(json["schedule_loading"], false);
        assert_eq!(json["saved_ids"], serde_json::json!(["1"]));
        assert_eq!(json["body"]["kind"], "list");
        assert_eq!(json["body"]["active_days"], serde_json::json!([15, 16, 17, 20]));
        assert_eq!(json["body"]["result_count"], 1);
        assert_eq!(json["body"]["events"][0]["dateStart"], "2025-11-15");
        assert_eq!(json["body"]["events"][0]["saved"], true);
    }

    #[test]
    fn map_snapshot_marks_todays_events_with_coordinates() {
        let today = date("2025-11-16");
        let mut controller = controller_with(
            vec![
                event("1", "Lantern Fest", "2025-11-15", "2025-11-17", Some(AT)),
                event("2", "No position", "2025-11-16", "2025-11-16", None),
                event("3", "Later", "2025-11-20", "2025-11-21", Some(AT)),
            ],
            today,
        );
        controller.navigate(View::Map);

        let json = serde_json::to_value(Snapshot::capture(&controller, today)).unwrap();
        assert_eq!(json["body"]["kind"], "map");
        assert_eq!(json["body"]["count"], 2);
        let markers = json["body"]["markers"].as_array().unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0]["id"], "1");
    }

    #[test]
    fn detail_snapshot_falls_back_to_unknown_transport() {
        let today = date("2025-11-15");
        let mut controller = controller_with(
            vec![event("1", "Lantern Fest", "2025-11-15", "2025-11-17", Some(AT))],
            today,
        );
        assert_eq!(controller.open_event("1"), Some(AT));

        let json = serde_json::to_value(Snapshot::capture(&controller, today)).unwrap();
        assert_eq!(json["body"]["kind"], "detail");
        assert_eq!(json["body"]["transport_loading"], true);
        assert_eq!(json["body"]["transport"]["source"], "unknown");
        assert!(json["body"]["calendar_link"].as_str().unwrap().contains("action=TEMPLATE"));
    }

    #[test]
    fn schedule_snapshot_splits_upcoming_and_past() {
        let today = date("2025-11-16");
        let mut controller = controller_with(
            vec![
                event("1", "Running", "2025-11-15", "2025-11-17", None),
                event("2", "Soon", "2025-11-20", "2025-11-20", None),
            ],
            today,
        );
        let load = controller.change_session(Some(Identity { id: Uuid::new_v4() }));
        controller.finish_schedule_load(
            &load,
            vec![
                event("1", "Running", "2025-11-15", "2025-11-17", None),
                event("2", "Soon", "2025-11-20", "2025-11-20", None),
            ],
        );
        controller.navigate(View::Schedule);

        let json = serde_json::to_value(Snapshot::capture(&controller, today)).unwrap();
        assert_eq!(json["signed_in"], true);
        let entries: Vec<&Value> = json["body"]["events"].as_array().unwrap().iter().collect();
        assert_eq!(entries[0]["upcoming"], false);
        assert_eq!(entries[1]["upcoming"], true);
    }
}
