//! crates/festival_planner_core/src/sources.rs
//!
//! The event data source the planner consumes. It walks an ordered chain of upstream
//! providers and falls back to the static catalog, so it never fails.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::CacheKey;
use crate::calendar;
use crate::catalog;
use crate::domain::{Category, Event};
use crate::ports::{EventGenerator, EventSource, FestivalFeed};

pub struct FallbackEventSource {
    generator: Option<Arc<dyn EventGenerator>>,
    festivals: Option<Arc<dyn FestivalFeed>>,
    today: fn() -> NaiveDate,
}

impl FallbackEventSource {
    pub fn new(
        generator: Option<Arc<dyn EventGenerator>>,
        festivals: Option<Arc<dyn FestivalFeed>>,
    ) -> Self {
        Self {
            generator,
            festivals,
            today: || Local::now().date_naive(),
        }
    }

    /// Overrides the clock used to anchor the festival feed window.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    async fn from_generator(&self, year: i32, month: u32, category: Category) -> Vec<Event> {
        let Some(generator) = &self.generator else {
            return Vec::new();
        };
        match generator.generate_events(year, month, category).await {
            Ok(events) => events
                .into_iter()
                .filter(Event::has_valid_range)
                .map(|mut event| {
                    event.category = category;
                    event
                })
                .collect(),
            Err(e) => {
                warn!("Event generation failed for {}: {}", CacheKey::new(year, month, category), e);
                Vec::new()
            }
        }
    }

    async fn from_festival_feed(&self, year: i32, month: u32) -> Vec<Event> {
        let Some(feed) = &self.festivals else {
            return Vec::new();
        };
        let from = calendar::first_of_previous_month((self.today)());
        match feed.festivals_from(from).await {
            Ok(events) => events
                .into_iter()
                .filter(|event| event.has_valid_range() && calendar::overlaps_month(event, year, month))
                .collect(),
            Err(e) => {
                warn!("Festival feed failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl EventSource for FallbackEventSource {
    async fn fetch_events(&self, year: i32, month: u32, category: Category) -> Vec<Event> {
        let key = CacheKey::new(year, month, category);
        let generated = self.from_generator(year, month, category).await;
        if !generated.is_empty() {
            info!("Using {} generated events for {}", generated.len(), key);
            return generated;
        }

        if category == Category::Festival {
            let listed = self.from_festival_feed(year, month).await;
            if !listed.is_empty() {
                info!("Using {} listed festivals for {}", listed.len(), key);
                return listed;
            }
        }

        warn!("No live events for {}. Using fallback catalog.", key);
        catalog::fallback_events(category)
    }
}
