//! services/api/src/adapters/tour_api.rs
//!
//! The national tourism open-data festival listing (`searchFestival1`), reached through
//! an ordered list of relays. It implements the `FestivalFeed` port from the `core` crate.

use async_trait::async_trait;
use chrono::NaiveDate;
use festival_planner_core::{
    catalog::CITY_NAME,
    domain::{Category, Coordinates, Event, TransportInfo},
    ports::{FestivalFeed, PortError, PortResult},
};
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Relay;

/// Busan City Hall, used when an item carries no usable position.
pub const DEFAULT_COORDINATES: Coordinates = Coordinates {
    lat: 35.1795543,
    lng: 129.0756416,
};
pub const DEFAULT_PRICE: &str = "Free (see details)";
const NO_IMAGE: &str = "https://via.placeholder.com/400x500?text=No+Image";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct TourApiAdapter {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
    area_code: u32,
    relays: Vec<Relay>,
}

impl TourApiAdapter {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        area_code: u32,
        relays: Vec<Relay>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            service_key: service_key.into(),
            area_code,
            relays,
        }
    }

    /// The upstream request, before any relay wrapping.
    ///
    /// data.go.kr issues the key already percent-encoded, so it is placed in the query
    /// as given; only the remaining parameters go through form encoding.
    pub fn target_url(&self, from: NaiveDate) -> PortResult<Url> {
        let endpoint = format!("{}/searchFestival1", self.base_url.trim_end_matches('/'));
        let area_code = self.area_code.to_string();
        let start = from.format("%Y%m%d").to_string();
        let mut url = Url::parse_with_params(
            &endpoint,
            &[
                ("numOfRows", "100"),
                ("pageNo", "1"),
                ("MobileOS", "ETC"),
                ("MobileApp", "AppTest"),
                ("_type", "json"),
                ("arrange", "A"),
                ("eventStartDate", start.as_str()),
                ("areaCode", area_code.as_str()),
                ("contentTypeId", "15"),
            ],
        )
        .map_err(|e| PortError::Unexpected(format!("Invalid tour API URL: {}", e)))?;
        let query = format!("serviceKey={}&{}", self.service_key, url.query().unwrap_or_default());
        url.set_query(Some(&query));
        Ok(url)
    }

    /// Wraps the target URL for one relay.
    fn relayed_url(relay: &Relay, target: &Url) -> PortResult<Url> {
        match relay {
            Relay::Direct => Ok(target.clone()),
            Relay::Proxy { endpoint, param } => {
                let mut url = Url::parse(endpoint)
                    .map_err(|e| PortError::Unexpected(format!("Invalid relay {}: {}", endpoint, e)))?;
                url.query_pairs_mut().append_pair(param, target.as_str());
                Ok(url)
            }
        }
    }

    /// Returns the decoded body, or `None` if this relay should be skipped.
    async fn try_relay(&self, url: Url) -> Option<Value> {
        let response = match self.http.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Relay network error for {}: {}", url.host_str().unwrap_or("?"), e);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!("Relay {} answered {}", url.host_str().unwrap_or("?"), response.status());
            return None;
        }
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to read relay body: {}", e);
                return None;
            }
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        // data.go.kr reports key and quota errors as XML.
        if trimmed.starts_with('<') {
            let preview: String = trimmed.chars().take(100).collect();
            warn!("Received XML response from tour API (likely error): {}", preview);
            return None;
        }
        match serde_json::from_str(trimmed) {
            Ok(json) => Some(json),
            Err(e) => {
                debug!("Relay body is not JSON: {}", e);
                None
            }
        }
    }
}

//=========================================================================================
// Response Mapping
//=========================================================================================

/// Strings or numbers, as the open-data API is inconsistent about both.
fn field_str<'a>(item: &'a Value, key: &str) -> Option<std::borrow::Cow<'a, str>> {
    match item.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(std::borrow::Cow::Borrowed(s.trim())),
        Value::Number(n) => Some(std::borrow::Cow::Owned(n.to_string())),
        _ => None,
    }
}

fn parse_compact_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
}

fn parse_coordinate(item: &Value, key: &str) -> Option<f64> {
    field_str(item, key)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v != 0.0)
}

/// Maps one listing item; items without parseable dates are dropped.
pub(crate) fn item_to_event(item: &Value) -> Option<Event> {
    let title = field_str(item, "title")?.into_owned();
    let date_start = parse_compact_date(&field_str(item, "eventstartdate")?)?;
    let date_end = parse_compact_date(&field_str(item, "eventenddate")?)?;

    let id = field_str(item, "contentid")
        .map(|s| s.into_owned())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let location = field_str(item, "addr1")
        .map(|s| s.into_owned())
        .unwrap_or_else(|| CITY_NAME.to_string());
    let image_url = field_str(item, "firstimage")
        .or_else(|| field_str(item, "firstimage2"))
        .map(|s| s.into_owned())
        .unwrap_or_else(|| NO_IMAGE.to_string());
    let description = field_str(item, "addr2")
        .map(|s| s.into_owned())
        .unwrap_or_else(|| title.clone());
    let coordinates = Coordinates {
        lat: parse_coordinate(item, "mapy").unwrap_or(DEFAULT_COORDINATES.lat),
        lng: parse_coordinate(item, "mapx").unwrap_or(DEFAULT_COORDINATES.lng),
    };

    Some(Event {
        id,
        title,
        location,
        date_start,
        date_end,
        category: Category::Festival,
        description,
        image_url,
        price: Some(DEFAULT_PRICE.to_string()),
        cast: Some("-".to_string()),
        coordinates: Some(coordinates),
        transport: Some(TransportInfo::unavailable()),
    })
}

/// `response.body.items.item` may be an array, a single object, or absent.
pub(crate) fn events_from_body(body: &Value) -> Vec<Event> {
    let items = body.pointer("/response/body/items/item");
    let listed: Vec<&Value> = match items {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    };
    listed.into_iter().filter_map(item_to_event).collect()
}

//=========================================================================================
// `FestivalFeed` Trait Implementation
//=========================================================================================

#[async_trait]
impl FestivalFeed for TourApiAdapter {
    async fn festivals_from(&self, from: NaiveDate) -> PortResult<Vec<Event>> {
        let target = self.target_url(from)?;
        for relay in &self.relays {
            let url = Self::relayed_url(relay, &target)?;
            if let Some(body) = self.try_relay(url).await {
                let events = events_from_body(&body);
                info!("Tour API returned {} festivals from {}", events.len(), from);
                return Ok(events);
            }
        }
        Err(PortError::Unavailable("Every tour API relay failed".to_string()))
    }
}
