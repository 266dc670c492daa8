//! services/api/src/adapters/places.rs
//!
//! Nearby parking and subway lookup through the Kakao Local category search.
//! Implements the `TransportLookup` port from the `core` crate.

use async_trait::async_trait;
use festival_planner_core::{
    domain::{Coordinates, ParkingLot, TransportInfo},
    ports::{PortError, PortResult, TransportLookup},
};
use serde::Deserialize;
use tracing::warn;

const PARKING_CATEGORY: &str = "PK6";
const SUBWAY_CATEGORY: &str = "SW8";
const PARKING_RADIUS_M: u32 = 1000;
const SUBWAY_RADIUS_M: u32 = 1500;
const MAX_PARKING_LOTS: usize = 3;
/// Average walking speed used to turn metres into minutes.
const WALK_METRES_PER_MINUTE: f64 = 60.0;
pub const NO_NEARBY_SUBWAY: &str = "No subway station within a 15-minute walk";

//=========================================================================================
// Response Structs
//=========================================================================================

#[derive(Debug, Deserialize)]
struct CategorySearchResponse {
    #[serde(default)]
    documents: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    place_name: String,
    #[serde(default)]
    address_name: String,
    #[serde(default)]
    road_address_name: String,
    /// Metres from the search centre, sent as a string.
    #[serde(default)]
    distance: String,
}

impl Place {
    fn into_parking_lot(self) -> ParkingLot {
        let address = if self.road_address_name.trim().is_empty() {
            self.address_name
        } else {
            self.road_address_name
        };
        ParkingLot {
            name: self.place_name,
            kind: "Parking lot".to_string(),
            address,
        }
    }

    fn walking_summary(&self) -> String {
        let metres = self.distance.trim().parse::<f64>().unwrap_or(0.0);
        let minutes = (metres / WALK_METRES_PER_MINUTE).round() as u64;
        format!("{} (about {} min walk)", self.place_name, minutes)
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct KakaoPlacesAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl KakaoPlacesAdapter {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
        }
    }

    async fn category_search(
        &self,
        api_key: &str,
        category: &str,
        at: Coordinates,
        radius: u32,
    ) -> PortResult<Vec<Place>> {
        let url = format!(
            "{}/v2/local/search/category.json",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, format!("KakaoAK {}", api_key))
            .query(&[
                ("category_group_code", category.to_string()),
                ("x", at.lng.to_string()),
                ("y", at.lat.to_string()),
                ("radius", radius.to_string()),
                ("sort", "distance".to_string()),
            ])
            .send()
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::Unavailable(format!(
                "{} search answered {}",
                category,
                response.status()
            )));
        }
        let body: CategorySearchResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(body.documents)
    }
}

//=========================================================================================
// `TransportLookup` Trait Implementation
//=========================================================================================

#[async_trait]
impl TransportLookup for KakaoPlacesAdapter {
    async fn nearby_transport(&self, at: Coordinates) -> TransportInfo {
        let Some(api_key) = self.api_key.as_deref() else {
            return TransportInfo::unavailable();
        };

        let (parking, subway) = futures::join!(
            self.category_search(api_key, PARKING_CATEGORY, at, PARKING_RADIUS_M),
            self.category_search(api_key, SUBWAY_CATEGORY, at, SUBWAY_RADIUS_M),
        );

        let parking = match parking {
            Ok(places) => places
                .into_iter()
                .take(MAX_PARKING_LOTS)
                .map(Place::into_parking_lot)
                .collect(),
            Err(e) => {
                warn!("Parking search failed: {}", e);
                Vec::new()
            }
        };
        let subway = match subway {
            Ok(places) => Some(match places.first() {
                Some(nearest) => nearest.walking_summary(),
                None => NO_NEARBY_SUBWAY.to_string(),
            }),
            Err(e) => {
                warn!("Subway search failed: {}", e);
                None
            }
        };

        TransportInfo {
            parking,
            subway,
            bus: Vec::new(),
        }
    }
}
