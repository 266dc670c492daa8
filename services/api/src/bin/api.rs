//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        db::DbAdapter, event_llm::OpenAiEventAdapter, local_storage::FileStorageProvider,
        places::KakaoPlacesAdapter, tour_api::TourApiAdapter,
    },
    config::Config,
    error::ApiError,
    web::{self, state::{local_today, AppState}},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use festival_planner_core::{
    cache::EventCache,
    ports::{EventGenerator, FestivalFeed},
    sources::FallbackEventSource,
};
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;

    let generator: Option<Arc<dyn EventGenerator>> = match &config.openai_api_key {
        Some(key) => {
            let openai_client = Client::with_config(OpenAIConfig::new().with_api_key(key));
            let adapter: Arc<dyn EventGenerator> = Arc::new(OpenAiEventAdapter::new(
                openai_client,
                config.event_model.clone(),
            ));
            Some(adapter)
        }
        None => {
            warn!("OPENAI_API_KEY not set. Event generation disabled.");
            None
        }
    };

    let festivals: Option<Arc<dyn FestivalFeed>> = match &config.tour_api_key {
        Some(key) => {
            let adapter: Arc<dyn FestivalFeed> = Arc::new(TourApiAdapter::new(
                http.clone(),
                config.tour_api_base_url.clone(),
                key.clone(),
                config.tour_api_area_code,
                config.tour_api_relays.clone(),
            ));
            Some(adapter)
        }
        None => {
            warn!("TOUR_API_KEY not set. Festival listing disabled.");
            None
        }
    };

    if config.kakao_rest_api_key.is_none() {
        warn!("KAKAO_REST_API_KEY not set. Nearby transport lookups disabled.");
    }
    let transport = Arc::new(KakaoPlacesAdapter::new(
        http,
        config.kakao_base_url.clone(),
        config.kakao_rest_api_key.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        events: Arc::new(FallbackEventSource::new(generator, festivals)),
        transport,
        schedules: db_adapter.clone(),
        accounts: db_adapter,
        devices: Arc::new(FileStorageProvider::new(&config.data_dir)),
        event_cache: Mutex::new(EventCache::new()),
        event_fetches: Mutex::new(HashMap::new()),
        clock: local_today,
    });

    // --- 5. Create the Web Router ---
    let origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid ALLOWED_ORIGIN '{}': {}", config.allowed_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
    let app = web::router(app_state).layer(cors);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
