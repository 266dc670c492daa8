//! In-memory port implementations shared by the unit tests.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::domain::{Category, Event, ScheduleRow};
use crate::ports::{
    EventGenerator, FestivalFeed, KeyValueStorage, PortError, PortResult, ScheduleRepository,
};

#[derive(Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.slots.lock().unwrap().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()> {
        self.slots.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRemote {
    rows: Mutex<Vec<ScheduleRow>>,
}

impl MemoryRemote {
    /// Appends a row without the uniqueness check `insert_row` applies.
    pub fn push_raw(&self, user_id: Uuid, event: Event) {
        self.rows.lock().unwrap().push(ScheduleRow {
            id: Uuid::new_v4(),
            user_id,
            event_data: event,
            created_at: Utc::now(),
        });
    }

    pub fn rows_for_any_user(&self) -> Vec<ScheduleRow> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScheduleRepository for MemoryRemote {
    async fn list_rows(&self, user_id: Uuid) -> PortResult<Vec<ScheduleRow>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_row(&self, user_id: Uuid, event: &Event) -> PortResult<()> {
        let exists = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .any(|row| row.user_id == user_id && row.event_data.id == event.id);
        if !exists {
            self.push_raw(user_id, event.clone());
        }
        Ok(())
    }

    async fn delete_row(&self, user_id: Uuid, event_id: &str) -> PortResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| !(row.user_id == user_id && row.event_data.id == event_id));
        Ok((before - rows.len()) as u64)
    }
}

pub struct FailingRemote;

#[async_trait]
impl ScheduleRepository for FailingRemote {
    async fn list_rows(&self, _user_id: Uuid) -> PortResult<Vec<ScheduleRow>> {
        Err(PortError::Unavailable("remote store offline".into()))
    }

    async fn insert_row(&self, _user_id: Uuid, _event: &Event) -> PortResult<()> {
        Err(PortError::Unavailable("remote store offline".into()))
    }

    async fn delete_row(&self, _user_id: Uuid, _event_id: &str) -> PortResult<u64> {
        Err(PortError::Unavailable("remote store offline".into()))
    }
}

/// A generator that replays a fixed answer and counts calls.
pub struct ScriptedGenerator {
    pub answer: Mutex<Option<PortResult<Vec<Event>>>>,
    pub calls: Mutex<u32>,
}

impl ScriptedGenerator {
    pub fn returning(answer: PortResult<Vec<Event>>) -> Self {
        Self {
            answer: Mutex::new(Some(answer)),
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl EventGenerator for ScriptedGenerator {
    async fn generate_events(&self, _year: i32, _month: u32, _category: Category)
        -> PortResult<Vec<Event>> {
        *self.calls.lock().unwrap() += 1;
        self.answer
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub struct ScriptedFeed {
    pub events: Vec<Event>,
    pub requested_from: Mutex<Option<NaiveDate>>,
}

#[async_trait]
impl FestivalFeed for ScriptedFeed {
    async fn festivals_from(&self, from: NaiveDate) -> PortResult<Vec<Event>> {
        *self.requested_from.lock().unwrap() = Some(from);
        Ok(self.events.clone())
    }
}

/// Shorthand for a bare event in tests.
pub fn event(id: &str, category: Category, start: &str, end: &str) -> Event {
    Event {
        id: id.to_string(),
        title: format!("Event {id}"),
        location: "Busan".to_string(),
        date_start: start.parse().unwrap(),
        date_end: end.parse().unwrap(),
        category,
        description: String::new(),
        image_url: String::new(),
        price: None,
        cast: None,
        coordinates: None,
        transport: None,
    }
}
