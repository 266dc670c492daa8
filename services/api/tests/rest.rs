//! services/api/tests/rest.rs
//!
//! Drives the REST surface through the router with in-memory ports.

use api_lib::{
    config::Config,
    web::{self, state::AppState},
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use festival_planner_core::{
    cache::EventCache,
    domain::{Category, Coordinates, Event, ScheduleRow, TransportInfo, User, UserCredentials},
    ports::{
        AccountService, DeviceStorageProvider, EventSource, KeyValueStorage, PortError,
        PortResult, ScheduleRepository, TransportLookup,
    },
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use tower::ServiceExt;
use uuid::Uuid;

//=========================================================================================
// Fakes
//=========================================================================================

struct CountingSource {
    calls: StdMutex<usize>,
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn event(id: &str, title: &str, location: &str, start: &str, end: &str) -> Event {
    Event {
        id: id.into(),
        title: title.into(),
        location: location.into(),
        date_start: date(start),
        date_end: date(end),
        category: Category::Festival,
        description: String::new(),
        image_url: "https://img.example/e.jpg".into(),
        price: None,
        cast: None,
        coordinates: None,
        transport: None,
    }
}

#[async_trait]
impl EventSource for CountingSource {
    async fn fetch_events(&self, _year: i32, _month: u32, _category: Category) -> Vec<Event> {
        *self.calls.lock().unwrap() += 1;
        // Give concurrent requests a chance to interleave with the fetch.
        tokio::task::yield_now().await;
        vec![
            event("1", "Lantern Fest", "Gwangalli", "2025-11-15", "2025-11-17"),
            event("2", "Jazz Night", "BEXCO", "2025-11-15", "2025-11-15"),
            event("3", "Film Week", "Centum", "2025-11-20", "2025-11-22"),
        ]
    }
}

struct FixedTransport;

#[async_trait]
impl TransportLookup for FixedTransport {
    async fn nearby_transport(&self, _at: Coordinates) -> TransportInfo {
        TransportInfo {
            subway: Some("Geumnyeonsan (about 11 min walk)".into()),
            ..Default::default()
        }
    }
}

/// Accounts and schedules backed by maps. The session token "good" belongs to `owner`.
struct MemoryAccounts {
    owner: Uuid,
    users: StdMutex<HashMap<String, UserCredentials>>,
    sessions: StdMutex<HashMap<String, Uuid>>,
}

#[async_trait]
impl AccountService for MemoryAccounts {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let user_id = Uuid::new_v4();
        self.users.lock().unwrap().insert(
            email.to_string(),
            UserCredentials {
                user_id,
                email: email.to_string(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.users
            .lock()
            .unwrap()
            .get(email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(email.to_string()))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        _expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.sessions.lock().unwrap().insert(session_id.to_string(), user_id);
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        if session_id == "good" {
            return Ok(self.owner);
        }
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .copied()
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.sessions.lock().unwrap().remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl ScheduleRepository for MemoryAccounts {
    async fn list_rows(&self, user_id: Uuid) -> PortResult<Vec<ScheduleRow>> {
        if user_id != self.owner {
            return Ok(Vec::new());
        }
        Ok(vec![ScheduleRow {
            id: Uuid::new_v4(),
            user_id,
            event_data: event("9", "Saved Fest", "Haeundae", "2025-12-01", "2025-12-02"),
            created_at: Utc::now(),
        }])
    }

    async fn insert_row(&self, _user_id: Uuid, _event: &Event) -> PortResult<()> {
        Ok(())
    }

    async fn delete_row(&self, _user_id: Uuid, _event_id: &str) -> PortResult<u64> {
        Ok(0)
    }
}

struct NoDevices;

struct NoStorage;

#[async_trait]
impl KeyValueStorage for NoStorage {
    async fn get_item(&self, _key: &str) -> PortResult<Option<String>> {
        Ok(None)
    }

    async fn set_item(&self, _key: &str, _value: &str) -> PortResult<()> {
        Ok(())
    }
}

impl DeviceStorageProvider for NoDevices {
    fn storage_for(&self, _device_id: Uuid) -> Arc<dyn KeyValueStorage> {
        Arc::new(NoStorage)
    }
}

//=========================================================================================
// Harness
//=========================================================================================

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".into(),
        log_level: tracing::Level::INFO,
        data_dir: PathBuf::from("./data"),
        allowed_origin: "http://localhost:5173".into(),
        openai_api_key: None,
        event_model: "gpt-4o-mini".into(),
        tour_api_key: None,
        tour_api_base_url: "http://127.0.0.1:9".into(),
        tour_api_area_code: 6,
        tour_api_relays: Vec::new(),
        kakao_rest_api_key: None,
        kakao_base_url: "http://127.0.0.1:9".into(),
    }
}

fn harness() -> (Router, Arc<CountingSource>) {
    let source = Arc::new(CountingSource {
        calls: StdMutex::new(0),
    });
    let accounts = Arc::new(MemoryAccounts {
        owner: Uuid::new_v4(),
        users: StdMutex::new(HashMap::new()),
        sessions: StdMutex::new(HashMap::new()),
    });
    let state = Arc::new(AppState {
        config: Arc::new(test_config()),
        events: source.clone(),
        transport: Arc::new(FixedTransport),
        schedules: accounts.clone(),
        accounts,
        devices: Arc::new(NoDevices),
        event_cache: tokio::sync::Mutex::new(EventCache::new()),
        event_fetches: tokio::sync::Mutex::new(HashMap::new()),
        clock: || NaiveDate::from_ymd_opt(2025, 11, 15).unwrap(),
    });
    (web::router(state), source)
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

//=========================================================================================
// Tests
//=========================================================================================

#[tokio::test]
async fn events_are_fetched_once_per_period() {
    let (app, source) = harness();

    let (status, json) = get(&app, "/events?year=2025&month=10&category=FESTIVAL", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["activeDays"], serde_json::json!([15, 16, 17, 20, 21, 22]));
    assert_eq!(json["events"].as_array().unwrap().len(), 3);

    let (status, _) = get(&app, "/events?year=2025&month=10&category=FESTIVAL&day=16", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(*source.calls.lock().unwrap(), 1);

    get(&app, "/events?year=2025&month=10&category=PERFORMANCE", None).await;
    assert_eq!(*source.calls.lock().unwrap(), 2);
}

#[tokio::test]
async fn concurrent_requests_share_one_fetch() {
    let (app, source) = harness();
    let uri = "/events?year=2025&month=10&category=FESTIVAL";

    let (first, second, third) = tokio::join!(
        get(&app, uri, None),
        get(&app, uri, None),
        get(&app, "/events?year=2025&month=10&category=FESTIVAL&day=20", None),
    );
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(third.1["events"][0]["id"], "3");
    assert_eq!(*source.calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn day_and_search_narrow_the_list() {
    let (app, _) = harness();

    let (_, json) = get(&app, "/events?year=2025&month=10&category=FESTIVAL&day=15", None).await;
    let titles: Vec<&str> = json["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Lantern Fest", "Jazz Night"]);

    let (_, json) = get(&app, "/events?year=2025&month=10&category=FESTIVAL&day=15&q=jazz", None).await;
    assert_eq!(json["events"].as_array().unwrap().len(), 1);
    assert_eq!(json["events"][0]["location"], "BEXCO");

    let (_, json) = get(&app, "/events?year=2025&month=10&category=FESTIVAL&day=16", None).await;
    assert_eq!(json["events"][0]["id"], "1");
}

#[tokio::test]
async fn invalid_periods_are_rejected() {
    let (app, source) = harness();

    let (status, _) = get(&app, "/events?year=2025&month=12&category=FESTIVAL", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/events?year=2025&month=1&category=FESTIVAL&day=30", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/events?year=2025&month=1&category=CONCERT", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(*source.calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn transport_lookup_is_public() {
    let (app, _) = harness();
    let (status, json) = get(&app, "/transport?lat=35.15&lng=129.11", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["transport"]["subway"], "Geumnyeonsan (about 11 min walk)");

    let (status, _) = get(&app, "/transport?lat=135&lng=129.11", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schedule_requires_a_session() {
    let (app, _) = harness();

    let (status, _) = get(&app, "/schedule", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = get(&app, "/schedule", Some("session=stale")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = get(&app, "/schedule", Some("theme=dark; session=good")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["events"][0]["title"], "Saved Fest");
    assert_eq!(json["events"][0]["dateStart"], "2025-12-01");
}

#[tokio::test]
async fn signup_then_login_issues_sessions() {
    let (app, _) = harness();
    let credentials = serde_json::json!({"email": "Visitor@Example.com", "password": "hunter22"});

    let response = post_json(&app, "/auth/signup", credentials.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("session="));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["email"], "visitor@example.com");
    assert!(cookie.contains(body["token"].as_str().unwrap()));

    let response = post_json(&app, "/auth/login", credentials).await;
    assert_eq!(response.status(), StatusCode::OK);

    let wrong = serde_json::json!({"email": "visitor@example.com", "password": "nope"});
    let response = post_json(&app, "/auth/login", wrong).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (app, _) = harness();
    let (status, json) = get(&app, "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"].get("/events").is_some());
    assert!(json["paths"].get("/schedule").is_some());
}
