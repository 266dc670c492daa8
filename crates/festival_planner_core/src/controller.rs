//! crates/festival_planner_core/src/controller.rs
//!
//! The view controller: one browsing session's state and the transitions user
//! actions cause. It performs no I/O itself. Transitions that need the outside world
//! return a request (`FetchRequest`, `ScheduleLoad`, `PendingWrite`, coordinates for a
//! transport lookup); the driver runs it and feeds the completion back in.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{CacheKey, EventCache};
use crate::calendar;
use crate::domain::{Category, Coordinates, DateSelection, Event, Identity, TransportInfo};
use crate::schedule::{self, PendingWrite, SavedEventsStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    List,
    Detail,
    Map,
    Ticket,
    Schedule,
}

/// An event fetch the driver must perform through the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub key: CacheKey,
    pub generation: u64,
}

/// A saved-events reload the driver must perform through the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleLoad {
    pub session: Option<Identity>,
    pub epoch: u64,
}

/// What the detail view shows for getting there.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportDisplay {
    /// Result of the live nearby lookup.
    Live(TransportInfo),
    /// Static information that came with the event.
    Listed(TransportInfo),
    /// Nothing is known.
    Unknown,
}

pub struct ViewController {
    store: SavedEventsStore,
    view: View,
    category: Category,
    selection: DateSelection,
    search: String,
    loading: bool,
    selected: Option<Event>,
    nearby: Option<TransportInfo>,
    transport_pending: bool,
    events: Arc<Vec<Event>>,
    cache: EventCache,
    saved: Vec<Event>,
    /// `saved` is not known until the first schedule load for the session lands.
    schedule_loading: bool,
    session: Option<Identity>,
    generation: u64,
    schedule_epoch: u64,
    scroll_epoch: u64,
}

impl ViewController {
    /// Starts on the list view for `today`, browsing festivals.
    pub fn new(store: SavedEventsStore, today: NaiveDate, session: Option<Identity>) -> Self {
        Self {
            store,
            view: View::List,
            category: Category::Festival,
            selection: DateSelection::from_date(today),
            search: String::new(),
            loading: false,
            selected: None,
            nearby: None,
            transport_pending: false,
            events: Arc::new(Vec::new()),
            cache: EventCache::new(),
            saved: Vec::new(),
            schedule_loading: true,
            session,
            generation: 0,
            schedule_epoch: 0,
            scroll_epoch: 0,
        }
    }

    //=====================================================================================
    // Event loading
    //=====================================================================================

    /// Serves the active period from the cache, or asks the driver to fetch it.
    pub fn request_events(&mut self) -> Option<FetchRequest> {
        let key = self.active_key();
        self.generation += 1;
        if let Some(events) = self.cache.lookup(&key) {
            debug!("Cache hit for {}", key);
            self.events = events;
            self.loading = false;
            return None;
        }
        self.loading = true;
        Some(FetchRequest {
            key,
            generation: self.generation,
        })
    }

    /// Records a fetch result. The cache always takes it; the displayed list only
    /// does when no newer request has been issued since. Returns whether it was shown.
    pub fn finish_fetch(&mut self, request: &FetchRequest, events: Vec<Event>) -> bool {
        let shared = self.cache.store(request.key, events);
        if request.generation != self.generation {
            info!(
                "Discarding stale fetch for {} (generation {} < {})",
                request.key, request.generation, self.generation
            );
            return false;
        }
        self.events = shared;
        self.loading = false;
        true
    }

    pub fn select_category(&mut self, category: Category) -> Option<FetchRequest> {
        if category == self.category {
            return None;
        }
        self.category = category;
        self.request_events()
    }

    /// Replaces the selection; refetches only when the month changed.
    pub fn change_date(&mut self, selection: DateSelection) -> Option<FetchRequest> {
        let period_changed = !self.selection.same_period(&selection);
        self.selection = selection;
        if period_changed {
            self.request_events()
        } else {
            None
        }
    }

    pub fn previous_month(&mut self) -> Option<FetchRequest> {
        self.change_date(self.selection.previous_month())
    }

    pub fn next_month(&mut self) -> Option<FetchRequest> {
        self.change_date(self.selection.next_month())
    }

    /// Picks a day in the displayed month. Invalid days are ignored.
    pub fn select_day(&mut self, day: u32) -> bool {
        match self.selection.with_day(day) {
            Some(selection) => {
                self.selection = selection;
                true
            }
            None => false,
        }
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    //=====================================================================================
    // Navigation
    //=====================================================================================

    /// Opens the detail view. Returns coordinates when a nearby lookup should start.
    pub fn open_event(&mut self, event_id: &str) -> Option<Coordinates> {
        let event = self.find_event(event_id)?.clone();
        let coordinates = event.coordinates;
        self.selected = Some(event);
        self.nearby = None;
        self.transport_pending = coordinates.is_some();
        self.view = View::Detail;
        self.scroll_epoch += 1;
        coordinates
    }

    pub fn back_to_list(&mut self) {
        self.selected = None;
        self.nearby = None;
        self.transport_pending = false;
        self.view = View::List;
    }

    /// Top-level navigation. The detail view is only reachable through `open_event`.
    pub fn navigate(&mut self, view: View) -> bool {
        match view {
            View::Detail => false,
            View::List => {
                self.back_to_list();
                self.scroll_epoch += 1;
                true
            }
            other => {
                self.view = other;
                self.scroll_epoch += 1;
                true
            }
        }
    }

    /// Applies a nearby-transport result if it still belongs to the open event.
    pub fn finish_transport_lookup(&mut self, event_id: &str, info: TransportInfo) -> bool {
        match &self.selected {
            Some(event) if event.id == event_id => {
                self.nearby = Some(info);
                self.transport_pending = false;
                true
            }
            _ => false,
        }
    }

    //=====================================================================================
    // Saved events
    //=====================================================================================

    /// Optimistically flips the saved state of an event and returns the backend write.
    ///
    /// Refused while a schedule load is outstanding: a local write is a whole-list
    /// overwrite, and computing it from an unloaded list would erase the stored one.
    pub fn toggle_save(&mut self, event_id: &str) -> Option<PendingWrite> {
        if self.schedule_loading {
            debug!("Ignoring toggle of {} while the schedule is loading", event_id);
            return None;
        }
        let event = self.find_event(event_id)?.clone();
        let toggle = self
            .store
            .toggle_save(&event, &self.saved, self.session.as_ref());
        self.saved = toggle.saved;
        Some(toggle.write)
    }

    /// Switches the authoritative backend. The current list is dropped and reloaded.
    pub fn change_session(&mut self, session: Option<Identity>) -> ScheduleLoad {
        self.session = session;
        self.saved.clear();
        self.reload_schedule()
    }

    pub fn reload_schedule(&mut self) -> ScheduleLoad {
        self.schedule_epoch += 1;
        self.schedule_loading = true;
        ScheduleLoad {
            session: self.session,
            epoch: self.schedule_epoch,
        }
    }

    pub fn finish_schedule_load(&mut self, load: &ScheduleLoad, events: Vec<Event>) -> bool {
        if load.epoch != self.schedule_epoch {
            return false;
        }
        self.saved = events;
        self.schedule_loading = false;
        true
    }

    pub fn store(&self) -> &SavedEventsStore {
        &self.store
    }

    //=====================================================================================
    // Derived state
    //=====================================================================================

    pub fn view(&self) -> View {
        self.view
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn selection(&self) -> DateSelection {
        self.selection
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_schedule_loading(&self) -> bool {
        self.schedule_loading
    }

    pub fn session(&self) -> Option<Identity> {
        self.session
    }

    pub fn scroll_epoch(&self) -> u64 {
        self.scroll_epoch
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn selected_event(&self) -> Option<&Event> {
        self.selected.as_ref()
    }

    pub fn saved_events(&self) -> &[Event] {
        &self.saved
    }

    pub fn saved_ids(&self) -> HashSet<String> {
        schedule::saved_ids(&self.saved)
    }

    pub fn is_saved(&self, event_id: &str) -> bool {
        self.saved.iter().any(|e| e.id == event_id)
    }

    pub fn active_days(&self) -> BTreeSet<u32> {
        calendar::active_days(&self.events, self.selection.year, self.selection.month)
    }

    pub fn displayed_events(&self) -> Vec<&Event> {
        calendar::displayed_events(&self.events, &self.selection, &self.search)
    }

    /// The period's events running on `today`, for the city map.
    pub fn events_today(&self, today: NaiveDate) -> Vec<&Event> {
        calendar::events_on(&self.events, today)
    }

    pub fn transport_pending(&self) -> bool {
        self.transport_pending
    }

    pub fn transport_display(&self) -> TransportDisplay {
        if let Some(live) = self.nearby.as_ref().filter(|info| !info.is_empty()) {
            return TransportDisplay::Live(live.clone());
        }
        match self.selected.as_ref().and_then(|e| e.transport.as_ref()) {
            Some(listed) if !listed.is_empty() => TransportDisplay::Listed(listed.clone()),
            _ => TransportDisplay::Unknown,
        }
    }

    fn active_key(&self) -> CacheKey {
        CacheKey::new(self.selection.year, self.selection.month, self.category)
    }

    /// Looks an event up wherever the user could have seen it.
    fn find_event(&self, event_id: &str) -> Option<&Event> {
        self.events
            .iter()
            .chain(self.selected.iter())
            .chain(self.saved.iter())
            .find(|e| e.id == event_id)
    }
}
