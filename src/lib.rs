pub mod categories;
pub mod commands;
pub mod config;
pub mod dedup;
pub mod details;
pub mod engine;
pub mod errors;
pub mod geo;
pub mod grid;
pub mod model;
pub mod pacing;
pub mod places;
pub mod search;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use secrecy::SecretString;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use commands::{scrape_places, SearchInput, SearchPayload};
pub use config::{AppConfig, EngineConfig, PublicAppConfig, SearchMode};
pub use engine::{AggregationEngine, AggregationOutcome, ProgressObserver, SearchProgress};
pub use errors::{AppError, AppResult};
pub use model::{Coordinate, EnrichedRecord, GridCell, RawCandidate, ResultSet, SearchRequest};
pub use places::{HttpPlacesProvider, PlacesProvider};

pub struct AppState {
    config: AppConfig,
}

impl AppState {
    pub fn initialize() -> Self {
        init_tracing();
        Self::with_config(AppConfig::from_env())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Validates `input`, then runs the engine against the HTTP provider.
    pub async fn search(
        &self,
        input: SearchInput,
        observer: Option<ProgressObserver>,
        cancel_flag: Option<Arc<AtomicBool>>,
    ) -> AppResult<AggregationOutcome> {
        let api_key = self
            .config
            .google_places_api_key
            .clone()
            .ok_or_else(|| AppError::Config("GOOGLE_PLACES_API_KEY is not configured".into()))?;
        let request = self.build_request(&input, api_key)?;
        let provider = HttpPlacesProvider::new(&self.config, request.api_credential.clone())?;
        self.search_with_provider(Arc::new(provider), &request, observer, cancel_flag)
            .await
    }

    pub async fn search_with_provider(
        &self,
        provider: Arc<dyn PlacesProvider>,
        request: &SearchRequest,
        observer: Option<ProgressObserver>,
        cancel_flag: Option<Arc<AtomicBool>>,
    ) -> AppResult<AggregationOutcome> {
        AggregationEngine::new(provider, &self.config.engine)
            .run(request, observer, cancel_flag)
            .await
    }

    pub fn build_request(
        &self,
        input: &SearchInput,
        api_key: SecretString,
    ) -> AppResult<SearchRequest> {
        let request = SearchRequest::new(
            &input.district,
            &input.city,
            &input.category,
            input.result_cap.unwrap_or(self.config.max_results as i64),
            self.config.max_results,
            api_key,
        )?;
        if !categories::is_known_category(&request.category) {
            debug!(category = request.category.as_str(), "free-text category");
        }
        Ok(request)
    }
}

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,maps_grid_scraper=debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    });
}
