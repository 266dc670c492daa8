//! services/api/src/adapters/event_llm.rs
//!
//! This module contains the adapter for the event-generating LLM.
//! It implements the `EventGenerator` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use festival_planner_core::{
    catalog::CITY_NAME,
    domain::{Category, Event},
    ports::{EventGenerator, PortError, PortResult},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

static JSON_ARRAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("json array regex"));

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `EventGenerator` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiEventAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEventAdapter {
    /// Creates a new `OpenAiEventAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn category_prompt(category: Category) -> &'static str {
    match category {
        Category::Performance => "Performance/Exhibition (Art, Music, Theater)",
        Category::Festival => "Festival/Event (Fireworks, Outdoor, Community)",
    }
}

fn build_prompt(year: i32, month: u32, category: Category) -> String {
    format!(
        "Generate 6 realistic cultural events for {city}, South Korea.\n\
         Year: {year}\n\
         Month: {month}\n\
         Category: {category}\n\n\
         Ensure the dates are within this specific month.\n\
         Use realistic location names in {city} (e.g., BEXCO, Gwangalli, Busan Cultural Center).\n\
         Provide realistic pricing, cast info (or '-').\n\
         For coordinates, provide approximate lat/lng for the location.\n\n\
         IMPORTANT: Provide DETAILED transport info.\n\
         - Parking: List 2-3 nearby parking lots with name, type (Public/Private/Paid), and approximate address.\n\
         - Bus: List 2 nearby bus stops and the bus route numbers that stop there.\n\n\
         Respond with a JSON array only. Each element has the keys id, title, dateStart and \
         dateEnd (YYYY-MM-DD), location, description, price, cast, coordinates {{lat, lng}} and \
         transport {{parking: [{{name, type, address}}], subway, bus: [{{stopName, routes}}]}}.",
        city = CITY_NAME,
        year = year,
        month = month.saturating_add(1),
        category = category_prompt(category),
    )
}

/// A fresh placeholder picture, so generated cards don't all look the same.
fn placeholder_image() -> String {
    format!("https://picsum.photos/400/500?random={}", Uuid::new_v4().simple())
}

/// Pulls the event list out of a model reply. The reply may wrap the array in prose or
/// markdown fences; entries that don't describe a valid event are dropped one by one.
pub(crate) fn parse_events(reply: &str, category: Category) -> PortResult<Vec<Event>> {
    let raw = JSON_ARRAY_RE
        .find(reply)
        .ok_or_else(|| PortError::Unexpected("LLM reply contained no JSON array".to_string()))?;
    let items: Vec<Value> = serde_json::from_str(raw.as_str())
        .map_err(|e| PortError::Unexpected(format!("LLM reply is not a JSON array: {}", e)))?;

    let total = items.len();
    let events: Vec<Event> = items
        .into_iter()
        .filter_map(|item| normalize_item(item, category))
        .collect();
    if events.len() < total {
        warn!("Dropped {} malformed generated events", total - events.len());
    }
    Ok(events)
}

fn normalize_item(item: Value, category: Category) -> Option<Event> {
    let Value::Object(mut fields) = item else {
        return None;
    };
    let id = match fields.remove("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => Uuid::new_v4().to_string(),
    };
    fields.insert("id".into(), Value::String(id));
    fields.insert("category".into(), Value::String(category.as_str().into()));
    fields.insert("imageUrl".into(), Value::String(placeholder_image()));
    fields.entry("description").or_insert_with(|| Value::String(String::new()));

    match serde_json::from_value::<Event>(Value::Object(fields)) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!("Skipping generated event: {}", e);
            None
        }
    }
}

//=========================================================================================
// `EventGenerator` Trait Implementation
//=========================================================================================

#[async_trait]
impl EventGenerator for OpenAiEventAdapter {
    async fn generate_events(
        &self,
        year: i32,
        month: u32,
        category: Category,
    ) -> PortResult<Vec<Event>> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content("You are a local culture guide. You answer with machine-readable JSON only.")
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_prompt(year, month, category))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unavailable(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Event generation LLM returned no text content.".to_string())
            })?;

        parse_events(&content, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_the_array_from_a_fenced_reply() {
        let reply = r#"Here you go:
```json
[
  {"id": "a1", "title": "Gwangalli Drone Show", "dateStart": "2025-11-01", "dateEnd": "2025-11-30",
   "location": "Gwangalli Beach", "description": "Drones over the bridge",
   "coordinates": {"lat": 35.153, "lng": 129.118},
   "transport": {"parking": [{"name": "Beach Lot", "type": "Public", "address": "Gwangan-ro"}],
                 "bus": [{"stopName": "Gwangalli", "routes": ["41", "42"]}]}}
]
```"#;
        let events = parse_events(reply, Category::Festival).unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.id, "a1");
        assert_eq!(event.category, Category::Festival);
        assert!(event.image_url.starts_with("https://picsum.photos/400/500?random="));
        assert_eq!(event.transport.as_ref().unwrap().bus[0].routes, vec!["41", "42"]);
    }

    #[test]
    fn malformed_entries_are_dropped_individually() {
        let reply = r#"[
            {"id": 7, "title": "Jazz", "dateStart": "2025-11-03", "dateEnd": "2025-11-03", "location": "BEXCO"},
            {"id": "8", "title": "No dates", "location": "BEXCO"},
            "not an object"
        ]"#;
        let events = parse_events(reply, Category::Performance).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "7");
        assert_eq!(events[0].description, "");
    }

    #[test]
    fn reply_without_array_is_an_error() {
        assert!(parse_events("I cannot help with that.", Category::Festival).is_err());
    }

    #[test]
    fn prompt_uses_one_based_month() {
        let prompt = build_prompt(2025, 0, Category::Performance);
        assert!(prompt.contains("Month: 1\n"));
        assert!(prompt.contains("Performance/Exhibition"));
    }
}
