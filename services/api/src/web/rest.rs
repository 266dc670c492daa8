//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    auth::{self, AuthResponse, LoginRequest, SignupRequest},
    state::AppState,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use festival_planner_core::{
    cache::CacheKey,
    calendar,
    domain::{Category, Coordinates, DateSelection, Event, Identity, TransportInfo},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        events_handler,
        transport_handler,
        schedule_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
    ),
    components(
        schemas(EventsResponse, TransportResponse, ScheduleResponse, SignupRequest, LoginRequest, AuthResponse)
    ),
    tags(
        (name = "Festival Planner API", description = "Event discovery and personal schedule endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventsQuery {
    pub year: i32,
    /// Zero-based month (0 = January).
    pub month: u32,
    #[param(value_type = String, example = "FESTIVAL")]
    pub category: Category,
    /// Narrows `events` to one day of the month.
    pub day: Option<u32>,
    /// Free-text search over title and location.
    pub q: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub year: i32,
    pub month: u32,
    #[schema(value_type = String)]
    pub category: Category,
    /// Days of the month with at least one event running.
    pub active_days: Vec<u32>,
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<Event>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransportQuery {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize, ToSchema)]
pub struct TransportResponse {
    #[schema(value_type = Object)]
    pub transport: TransportInfo,
}

#[derive(Serialize, ToSchema)]
pub struct ScheduleResponse {
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<Event>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the events of one month and category.
///
/// Results are shared through a server-side cache. Each period is fetched from the
/// upstream sources once, even when requests for it arrive concurrently.
#[utoipa::path(
    get,
    path = "/events",
    params(EventsQuery),
    responses(
        (status = 200, description = "Events for the period", body = EventsResponse),
        (status = 400, description = "Invalid month or day")
    )
)]
pub async fn events_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if query.month > 11 {
        return Err((StatusCode::BAD_REQUEST, "month must be between 0 and 11".to_string()));
    }
    let key = CacheKey::new(query.year, query.month, query.category);

    let events = app_state.cached_events(key).await;

    let search = query.q.as_deref().unwrap_or("");
    let listed: Vec<Event> = match query.day {
        Some(day) => {
            let selection = DateSelection::new(query.year, query.month, day)
                .ok_or((StatusCode::BAD_REQUEST, format!("day {} is not in that month", day)))?;
            calendar::displayed_events(&events, &selection, search)
                .into_iter()
                .cloned()
                .collect()
        }
        None => events
            .iter()
            .filter(|event| calendar::matches_query(event, search))
            .cloned()
            .collect(),
    };

    Ok(Json(EventsResponse {
        year: query.year,
        month: query.month,
        category: query.category,
        active_days: calendar::active_days(&events, query.year, query.month)
            .into_iter()
            .collect(),
        events: listed,
    }))
}

/// Look up parking and subway access around a position.
#[utoipa::path(
    get,
    path = "/transport",
    params(TransportQuery),
    responses(
        (status = 200, description = "Nearby transport, or a placeholder when unavailable", body = TransportResponse),
        (status = 400, description = "Invalid coordinates")
    )
)]
pub async fn transport_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<TransportQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let valid = (-90.0..=90.0).contains(&query.lat) && (-180.0..=180.0).contains(&query.lng);
    if !valid {
        return Err((StatusCode::BAD_REQUEST, "Coordinates out of range".to_string()));
    }
    let transport = app_state
        .transport
        .nearby_transport(Coordinates { lat: query.lat, lng: query.lng })
        .await;
    Ok(Json(TransportResponse { transport }))
}

/// The signed-in user's saved events, oldest first.
#[utoipa::path(
    get,
    path = "/schedule",
    responses(
        (status = 200, description = "Saved events", body = ScheduleResponse),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn schedule_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let rows = app_state.schedules.list_rows(identity.id).await.map_err(|e| {
        error!("Error fetching schedules for user {}: {:?}", identity.id, e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load schedule".to_string())
    })?;
    let events = rows.into_iter().map(|row| row.event_data).collect();
    Ok(Json(ScheduleResponse { events }))
}
