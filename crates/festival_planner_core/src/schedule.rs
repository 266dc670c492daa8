//! crates/festival_planner_core/src/schedule.rs
//!
//! The saved-events store: a personal schedule persisted either remotely (one row per
//! saved event, owned by the signed-in user) or in device-local storage (one serialized
//! list). The session decides which backend is authoritative; the two are never merged.
//!
//! Toggling is optimistic: the new list is computed and returned synchronously, and the
//! backend write is handed back as a `PendingWrite` for the caller to run. A failed
//! write is logged and never rolled back.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::domain::{Event, Identity};
use crate::ports::{KeyValueStorage, PortError, PortResult, ScheduleRepository};

/// Storage slot holding the guest schedule.
pub const LOCAL_STORAGE_KEY: &str = "bfp_saved_events";

//=========================================================================================
// Backend Selection
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleBackend {
    Remote { user_id: Uuid },
    Local,
}

impl ScheduleBackend {
    pub fn for_session(session: Option<&Identity>) -> Self {
        match session {
            Some(identity) => ScheduleBackend::Remote {
                user_id: identity.id,
            },
            None => ScheduleBackend::Local,
        }
    }
}

/// The backend mutation a toggle requires.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleChange {
    /// Add one remote row carrying the full event.
    Insert(Event),
    /// Remove the remote row for this event id.
    Delete(String),
    /// Replace the whole local list.
    Overwrite(Vec<Event>),
}

//=========================================================================================
// The Store
//=========================================================================================

#[derive(Clone)]
pub struct SavedEventsStore {
    remote: Arc<dyn ScheduleRepository>,
    local: Arc<dyn KeyValueStorage>,
}

/// The outcome of an optimistic toggle.
pub struct Toggle {
    /// The schedule to render immediately.
    pub saved: Vec<Event>,
    /// Whether the event is in `saved`.
    pub now_saved: bool,
    pub write: PendingWrite,
}

impl SavedEventsStore {
    pub fn new(remote: Arc<dyn ScheduleRepository>, local: Arc<dyn KeyValueStorage>) -> Self {
        Self { remote, local }
    }

    /// Reads the authoritative schedule for the session. Never fails: read errors
    /// and corrupt local content are logged and yield an empty schedule.
    pub async fn load(&self, session: Option<&Identity>) -> Vec<Event> {
        let loaded = match ScheduleBackend::for_session(session) {
            ScheduleBackend::Remote { user_id } => match self.remote.list_rows(user_id).await {
                Ok(rows) => rows.into_iter().map(|row| row.event_data).collect(),
                Err(e) => {
                    error!("Error fetching schedules for user {}: {:?}", user_id, e);
                    Vec::new()
                }
            },
            ScheduleBackend::Local => match self.read_local().await {
                Ok(events) => events,
                Err(e) => {
                    warn!("Failed to read saved events from local storage: {}", e);
                    Vec::new()
                }
            },
        };
        dedupe_by_id(loaded)
    }

    /// Flips membership of `event` in `current` and describes the backend write.
    pub fn toggle_save(
        &self,
        event: &Event,
        current: &[Event],
        session: Option<&Identity>,
    ) -> Toggle {
        let already_saved = current.iter().any(|e| e.id == event.id);

        let saved: Vec<Event> = if already_saved {
            current.iter().filter(|e| e.id != event.id).cloned().collect()
        } else {
            current.iter().cloned().chain(std::iter::once(event.clone())).collect()
        };

        let backend = ScheduleBackend::for_session(session);
        let change = match backend {
            ScheduleBackend::Remote { .. } if already_saved => ScheduleChange::Delete(event.id.clone()),
            ScheduleBackend::Remote { .. } => ScheduleChange::Insert(event.clone()),
            ScheduleBackend::Local => ScheduleChange::Overwrite(saved.clone()),
        };

        Toggle {
            saved,
            now_saved: !already_saved,
            write: PendingWrite {
                store: self.clone(),
                backend,
                change,
            },
        }
    }

    async fn read_local(&self) -> PortResult<Vec<Event>> {
        match self.local.get_item(LOCAL_STORAGE_KEY).await? {
            None => Ok(Vec::new()),
            Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| PortError::Unexpected(format!("Failed to parse saved events: {}", e))),
        }
    }

    async fn write_local(&self, events: &[Event]) -> PortResult<()> {
        let serialized =
            serde_json::to_string(events).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.local.set_item(LOCAL_STORAGE_KEY, &serialized).await
    }
}

//=========================================================================================
// Pending Writes
//=========================================================================================

/// A backend write issued after the optimistic update has been applied.
pub struct PendingWrite {
    store: SavedEventsStore,
    backend: ScheduleBackend,
    change: ScheduleChange,
}

impl PendingWrite {
    pub fn backend(&self) -> ScheduleBackend {
        self.backend
    }

    pub fn change(&self) -> &ScheduleChange {
        &self.change
    }

    pub async fn commit(self) -> PortResult<()> {
        match (self.backend, &self.change) {
            (ScheduleBackend::Remote { user_id }, ScheduleChange::Insert(event)) => {
                self.store.remote.insert_row(user_id, event).await
            }
            (ScheduleBackend::Remote { user_id }, ScheduleChange::Delete(event_id)) => {
                let removed = self.store.remote.delete_row(user_id, event_id).await?;
                if removed == 0 {
                    warn!("No schedule row matched event {} for user {}", event_id, user_id);
                }
                Ok(())
            }
            (_, ScheduleChange::Overwrite(events)) => self.store.write_local(events).await,
            (ScheduleBackend::Local, change) => Err(PortError::Unexpected(format!(
                "Remote change {:?} issued against local storage",
                change
            ))),
        }
    }

    /// Runs the write and logs a failure instead of returning it.
    pub async fn commit_or_log(self) {
        let description = format!("{:?}", self.backend);
        match self.commit().await {
            Ok(()) => debug!("Schedule write committed to {}", description),
            Err(e) => error!("Schedule write to {} failed: {:?}", description, e),
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

/// The id set used for "is this event saved" lookups while rendering.
pub fn saved_ids(events: &[Event]) -> HashSet<String> {
    events.iter().map(|e| e.id.clone()).collect()
}

/// Keeps the first occurrence of every id.
fn dedupe_by_id(events: Vec<Event>) -> Vec<Event> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|event| seen.insert(event.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::testing::{FailingRemote, MemoryRemote, MemoryStorage};

    fn store() -> (SavedEventsStore, Arc<MemoryRemote>, Arc<MemoryStorage>) {
        let remote = Arc::new(MemoryRemote::default());
        let local = Arc::new(MemoryStorage::default());
        (SavedEventsStore::new(remote.clone(), local.clone()), remote, local)
    }

    fn identity() -> Identity {
        Identity { id: Uuid::new_v4() }
    }

    #[tokio::test]
    async fn guest_schedule_round_trips_through_local_storage() {
        let (store, remote, _) = store();
        let events = catalog::all_events();

        let toggle = store.toggle_save(&events[0], &[], None);
        assert!(toggle.now_saved);
        toggle.write.commit().await.unwrap();
        let toggle = store.toggle_save(&events[3], &toggle.saved, None);
        toggle.write.commit().await.unwrap();

        let reloaded = store.load(None).await;
        let ids: Vec<_> = reloaded.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);
        assert!(remote.rows_for_any_user().is_empty());
    }

    #[tokio::test]
    async fn guest_schedule_is_not_visible_after_sign_in() {
        let (store, _, _) = store();
        let event = catalog::all_events().remove(0);

        store.toggle_save(&event, &[], None).write.commit().await.unwrap();
        assert_eq!(store.load(None).await.len(), 1);

        assert!(store.load(Some(&identity())).await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_local_storage_loads_empty() {
        let (store, _, local) = store();
        local.set_item(LOCAL_STORAGE_KEY, "{not json").await.unwrap();
        assert!(store.load(None).await.is_empty());
    }

    #[tokio::test]
    async fn remote_toggle_inserts_then_deletes_by_event_id() {
        let (store, remote, local) = store();
        let user = identity();
        let event = catalog::all_events().remove(1);

        let added = store.toggle_save(&event, &[], Some(&user));
        assert_eq!(added.write.change(), &ScheduleChange::Insert(event.clone()));
        added.write.commit().await.unwrap();
        assert_eq!(store.load(Some(&user)).await, vec![event.clone()]);

        let removed = store.toggle_save(&event, &added.saved, Some(&user));
        assert!(!removed.now_saved);
        assert!(removed.saved.is_empty());
        assert_eq!(removed.write.change(), &ScheduleChange::Delete(event.id.clone()));
        removed.write.commit().await.unwrap();

        assert!(store.load(Some(&user)).await.is_empty());
        assert!(remote.rows_for_any_user().is_empty());
        assert!(local.get_item(LOCAL_STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remote_read_failure_loads_empty() {
        let store = SavedEventsStore::new(Arc::new(FailingRemote), Arc::new(MemoryStorage::default()));
        assert!(store.load(Some(&identity())).await.is_empty());
    }

    #[tokio::test]
    async fn failed_write_keeps_optimistic_list() {
        let store = SavedEventsStore::new(Arc::new(FailingRemote), Arc::new(MemoryStorage::default()));
        let event = catalog::all_events().remove(2);

        let toggle = store.toggle_save(&event, &[], Some(&identity()));
        assert_eq!(toggle.saved.len(), 1);
        toggle.write.commit_or_log().await;
        assert_eq!(toggle.saved[0].id, event.id);
    }

    #[tokio::test]
    async fn duplicate_remote_rows_collapse_by_id() {
        let (store, remote, _) = store();
        let user = identity();
        let event = catalog::all_events().remove(0);
        remote.push_raw(user.id, event.clone());
        remote.push_raw(user.id, event.clone());

        assert_eq!(store.load(Some(&user)).await.len(), 1);
    }

    #[test]
    fn toggling_twice_restores_unsaved_state() {
        let (store, _, _) = store();
        let event = catalog::all_events().remove(0);

        let first = store.toggle_save(&event, &[], None);
        let second = store.toggle_save(&event, &first.saved, None);

        assert!(!saved_ids(&second.saved).contains(&event.id));
        assert_eq!(second.write.change(), &ScheduleChange::Overwrite(Vec::new()));
    }
}
