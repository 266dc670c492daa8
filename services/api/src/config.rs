//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// The public relays the open-data API is reached through, in the order they are tried.
pub const DEFAULT_TOUR_API_RELAYS: &str = "https://api.allorigins.win/raw?url=,https://api.codetabs.com/v1/proxy?quest=,https://corsproxy.io/?url=";

/// One way of reaching the open-data API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Relay {
    /// Call the API directly.
    Direct,
    /// Pass the full target URL in `param` of `endpoint`.
    Proxy { endpoint: String, param: String },
}

impl Relay {
    /// Parses `direct` or a prefix of the form `https://host/path?param=`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("direct") {
            return Ok(Relay::Direct);
        }
        let (endpoint, query) = raw
            .rsplit_once('?')
            .ok_or_else(|| format!("relay '{}' has no '?param=' suffix", raw))?;
        let param = query
            .strip_suffix('=')
            .filter(|p| !p.is_empty() && !p.contains('&'))
            .ok_or_else(|| format!("relay '{}' must end with '?param='", raw))?;
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(format!("relay '{}' is not an http(s) URL", raw));
        }
        Ok(Relay::Proxy {
            endpoint: endpoint.to_string(),
            param: param.to_string(),
        })
    }

    pub fn parse_list(raw: &str) -> Result<Vec<Self>, String> {
        raw.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Relay::parse)
            .collect()
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub data_dir: PathBuf,
    pub allowed_origin: String,
    pub openai_api_key: Option<String>,
    pub event_model: String,
    pub tour_api_key: Option<String>,
    pub tour_api_base_url: String,
    pub tour_api_area_code: u32,
    pub tour_api_relays: Vec<Relay>,
    pub kakao_rest_api_key: Option<String>,
    pub kakao_base_url: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let allowed_origin = std::env::var("ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        // --- Load API Keys (as optional) ---
        let openai_api_key = non_empty_var("OPENAI_API_KEY");
        let tour_api_key = non_empty_var("TOUR_API_KEY");
        let kakao_rest_api_key = non_empty_var("KAKAO_REST_API_KEY");

        // --- Load Adapter-specific Settings ---
        let event_model =
            std::env::var("EVENT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let tour_api_base_url = std::env::var("TOUR_API_BASE_URL")
            .unwrap_or_else(|_| "https://apis.data.go.kr/B551011/KorService1".to_string());
        let tour_api_area_code = match std::env::var("TOUR_API_AREA_CODE") {
            Ok(raw) => raw.parse::<u32>().map_err(|e| {
                ConfigError::InvalidValue("TOUR_API_AREA_CODE".to_string(), e.to_string())
            })?,
            Err(_) => 6,
        };
        let relays_str = std::env::var("TOUR_API_RELAYS")
            .unwrap_or_else(|_| DEFAULT_TOUR_API_RELAYS.to_string());
        let tour_api_relays = Relay::parse_list(&relays_str)
            .map_err(|e| ConfigError::InvalidValue("TOUR_API_RELAYS".to_string(), e))?;
        let kakao_base_url = std::env::var("KAKAO_BASE_URL")
            .unwrap_or_else(|_| "https://dapi.kakao.com".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            data_dir,
            allowed_origin,
            openai_api_key,
            event_model,
            tour_api_key,
            tour_api_base_url,
            tour_api_area_code,
            tour_api_relays,
            kakao_rest_api_key,
            kakao_base_url,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
