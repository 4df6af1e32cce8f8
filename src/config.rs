use std::time::Duration;
use std::{env, io};

use secrecy::SecretString;
use serde::Serialize;
use tracing::{debug, warn};

const DEFAULT_MAPS_API_BASE: &str = "https://maps.googleapis.com/maps/api";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
const DEFAULT_MAX_RESULTS: usize = 1000;

/// Hard ceiling the provider applies to a single text query.
pub const PROVIDER_PER_QUERY_MAX: usize = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// n x n grid of overlapping cells sized from the result cap.
    Grid,
    /// One cell at the resolved center.
    SingleQuery,
}

impl SearchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "grid" => Some(SearchMode::Grid),
            "single" | "single_query" => Some(SearchMode::SingleQuery),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EngineConfig {
    pub search_mode: SearchMode,
    pub grid_step_degrees: f64,
    pub search_radius_meters: u32,
    pub per_cell_cap: usize,
    pub max_pages_per_cell: usize,
    pub cursor_activation_delay_ms: u64,
    pub details_interval_ms: u64,
    pub search_interval_ms: u64,
    pub max_concurrent_cells: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search_mode: SearchMode::Grid,
            grid_step_degrees: 0.02,
            search_radius_meters: 2000,
            per_cell_cap: PROVIDER_PER_QUERY_MAX,
            max_pages_per_cell: 3,
            cursor_activation_delay_ms: 1800,
            details_interval_ms: 120,
            search_interval_ms: 0,
            max_concurrent_cells: 1,
        }
    }
}

impl EngineConfig {
    pub fn cursor_activation_delay(&self) -> Duration {
        Duration::from_millis(self.cursor_activation_delay_ms)
    }

    pub fn details_interval(&self) -> Duration {
        Duration::from_millis(self.details_interval_ms)
    }

    pub fn search_interval(&self) -> Duration {
        Duration::from_millis(self.search_interval_ms)
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub google_places_api_key: Option<SecretString>,
    pub maps_api_base: String,
    pub http_timeout_secs: u64,
    pub max_results: usize,
    pub engine: EngineConfig,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicAppConfig {
    pub maps_api_base: String,
    pub http_timeout_secs: u64,
    pub max_results: usize,
    pub engine: EngineConfig,
    pub has_google_places_key: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_places_api_key: None,
            maps_api_base: DEFAULT_MAPS_API_BASE.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_results: DEFAULT_MAX_RESULTS,
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();
        let search_mode = match lookup("SEARCH_MODE") {
            Some(raw) => SearchMode::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "unknown SEARCH_MODE; using grid");
                SearchMode::Grid
            }),
            None => defaults.search_mode,
        };

        Self {
            google_places_api_key: lookup("GOOGLE_PLACES_API_KEY")
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
            maps_api_base: lookup("GOOGLE_MAPS_API_BASE")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MAPS_API_BASE.to_string()),
            http_timeout_secs: parse_or(
                &lookup,
                "PLACES_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )
            .max(1),
            max_results: parse_or(&lookup, "MAX_RESULTS", DEFAULT_MAX_RESULTS).max(1),
            engine: EngineConfig {
                search_mode,
                grid_step_degrees: positive_or(
                    parse_or(&lookup, "GRID_STEP_DEGREES", defaults.grid_step_degrees),
                    defaults.grid_step_degrees,
                ),
                search_radius_meters: parse_or(
                    &lookup,
                    "SEARCH_RADIUS_METERS",
                    defaults.search_radius_meters,
                ),
                per_cell_cap: parse_or(&lookup, "PER_CELL_CAP", defaults.per_cell_cap)
                    .clamp(1, PROVIDER_PER_QUERY_MAX),
                max_pages_per_cell: parse_or(
                    &lookup,
                    "MAX_PAGES_PER_CELL",
                    defaults.max_pages_per_cell,
                )
                .max(1),
                cursor_activation_delay_ms: parse_or(
                    &lookup,
                    "CURSOR_ACTIVATION_DELAY_MS",
                    defaults.cursor_activation_delay_ms,
                ),
                details_interval_ms: parse_or(
                    &lookup,
                    "DETAILS_INTERVAL_MS",
                    defaults.details_interval_ms,
                ),
                search_interval_ms: parse_or(
                    &lookup,
                    "SEARCH_INTERVAL_MS",
                    defaults.search_interval_ms,
                ),
                max_concurrent_cells: parse_or(
                    &lookup,
                    "MAX_CONCURRENT_CELLS",
                    defaults.max_concurrent_cells,
                )
                .max(1),
            },
        }
    }

    pub fn public_profile(&self) -> PublicAppConfig {
        PublicAppConfig {
            maps_api_base: self.maps_api_base.clone(),
            http_timeout_secs: self.http_timeout_secs,
            max_results: self.max_results,
            engine: self.engine.clone(),
            has_google_places_key: self.google_places_api_key.is_some(),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn positive_or(value: f64, default: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        default
    }
}
