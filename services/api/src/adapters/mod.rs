pub mod db;
pub mod event_llm;
pub mod local_storage;
pub mod places;
pub mod tour_api;

pub use db::DbAdapter;
pub use event_llm::OpenAiEventAdapter;
pub use local_storage::{FileStorage, FileStorageProvider};
pub use places::KakaoPlacesAdapter;
pub use tour_api::TourApiAdapter;
