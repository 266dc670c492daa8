//! crates/festival_planner_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the planner's core logic.
//! These traits form the boundary of the hexagonal architecture, keeping the core
//! independent of databases, HTTP APIs and storage media.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Category, Coordinates, Event, ScheduleRow, TransportInfo, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Event Data Ports
//=========================================================================================

/// The uniform event feed the view layer consumes.
///
/// Implementations never fail: total failure resolves to an empty list.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// `month` is zero-based.
    async fn fetch_events(&self, year: i32, month: u32, category: Category) -> Vec<Event>;
}

/// AI content generation of plausible events for a period.
#[async_trait]
pub trait EventGenerator: Send + Sync {
    async fn generate_events(&self, year: i32, month: u32, category: Category)
        -> PortResult<Vec<Event>>;
}

/// The government open-data festival listing.
#[async_trait]
pub trait FestivalFeed: Send + Sync {
    /// Lists festivals starting on or after `from`.
    async fn festivals_from(&self, from: NaiveDate) -> PortResult<Vec<Event>>;
}

/// Nearby parking, subway and bus lookup.
///
/// Resolves to `TransportInfo::unavailable()` when the provider cannot be reached.
#[async_trait]
pub trait TransportLookup: Send + Sync {
    async fn nearby_transport(&self, at: Coordinates) -> TransportInfo;
}

//=========================================================================================
// Persistence Ports
//=========================================================================================

/// The remote, account-scoped schedule table.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn list_rows(&self, user_id: Uuid) -> PortResult<Vec<ScheduleRow>>;

    async fn insert_row(&self, user_id: Uuid, event: &Event) -> PortResult<()>;

    /// Deletes the row matching `(user_id, event_id)`; returns the number of rows removed.
    async fn delete_row(&self, user_id: Uuid, event_id: &str) -> PortResult<u64>;
}

/// A string-keyed slot store with browser local-storage semantics.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()>;
}

/// Hands out the local storage that belongs to one device.
pub trait DeviceStorageProvider: Send + Sync {
    fn storage_for(&self, device_id: Uuid) -> Arc<dyn KeyValueStorage>;
}

//=========================================================================================
// Accounts
//=========================================================================================

#[async_trait]
pub trait AccountService: Send + Sync {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owner of a live (non-expired) auth session.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}
