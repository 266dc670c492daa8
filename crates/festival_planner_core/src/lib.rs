pub mod cache;
pub mod calendar;
pub mod catalog;
pub mod controller;
pub mod domain;
pub mod ports;
pub mod schedule;
pub mod sources;

#[cfg(test)]
mod testing;

pub use cache::{CacheKey, EventCache};
pub use controller::{FetchRequest, ScheduleLoad, TransportDisplay, View, ViewController};
pub use domain::{
    AuthSession, BusStop, Category, Coordinates, DateSelection, Event, Identity, ParkingLot,
    ScheduleRow, TransportInfo, User, UserCredentials,
};
pub use ports::{
    AccountService, DeviceStorageProvider, EventGenerator, EventSource, FestivalFeed,
    KeyValueStorage, PortError, PortResult, ScheduleRepository, TransportLookup,
};
pub use schedule::{PendingWrite, SavedEventsStore, ScheduleBackend, ScheduleChange};
pub use sources::FallbackEventSource;
