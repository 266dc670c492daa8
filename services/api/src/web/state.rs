//! services/api/src/web/state.rs
//!
//! Defines the application's shared and connection-specific states.

use crate::config::Config;
use chrono::{Local, NaiveDate};
use festival_planner_core::{
    cache::{CacheKey, EventCache},
    controller::ViewController,
    domain::{Event, Identity},
    ports::{AccountService, DeviceStorageProvider, EventSource, ScheduleRepository, TransportLookup},
    schedule::SavedEventsStore,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub events: Arc<dyn EventSource>,
    pub transport: Arc<dyn TransportLookup>,
    pub schedules: Arc<dyn ScheduleRepository>,
    pub accounts: Arc<dyn AccountService>,
    pub devices: Arc<dyn DeviceStorageProvider>,
    /// Backs the REST event endpoint. WebSocket sessions keep their own cache.
    pub event_cache: Mutex<EventCache>,
    /// One lock per period being fetched, so concurrent misses share a single fetch.
    pub event_fetches: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    pub clock: fn() -> NaiveDate,
}

impl AppState {
    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    /// The period's events from the shared cache, fetching them on the first miss.
    pub async fn cached_events(&self, key: CacheKey) -> Arc<Vec<Event>> {
        if let Some(events) = self.event_cache.lock().await.lookup(&key) {
            debug!("Cache hit for {}", key);
            return events;
        }

        let fetch_lock = self
            .event_fetches
            .lock()
            .await
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _fetching = fetch_lock.lock().await;

        // Whoever held the lock before us may have filled the entry.
        if let Some(events) = self.event_cache.lock().await.lookup(&key) {
            debug!("Cache filled for {} while waiting", key);
            return events;
        }
        let fetched = self.events.fetch_events(key.year, key.month, key.category).await;
        let events = self.event_cache.lock().await.store(key, fetched);
        self.event_fetches.lock().await.remove(&key);
        events
    }
}

/// The local calendar date, the default clock.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

//=========================================================================================
// ConnectionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single, active WebSocket connection.
pub struct ConnectionState {
    pub device_id: Uuid,
    pub controller: ViewController,
    /// Cancels every task spawned for this connection.
    pub cancellation_token: CancellationToken,
}

impl ConnectionState {
    /// Builds the view controller for one browser, with storage scoped to its device.
    pub fn new(app_state: &AppState, device_id: Uuid, session: Option<Identity>) -> Self {
        let store = SavedEventsStore::new(
            app_state.schedules.clone(),
            app_state.devices.storage_for(device_id),
        );
        Self {
            device_id,
            controller: ViewController::new(store, app_state.today(), session),
            cancellation_token: CancellationToken::new(),
        }
    }
}
