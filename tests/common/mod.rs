//! In-process places provider with scripted cells and call recording.

#![allow(dead_code)]

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::SecretString;

use maps_grid_scraper::places::{
    ApiStatus, DetailsResult, GeocodeResult, SearchPage, TextSearchQuery,
};
use maps_grid_scraper::{
    AppError, AppResult, Coordinate, EngineConfig, PlacesProvider, RawCandidate, SearchRequest,
};

pub const CENTER: Coordinate = Coordinate {
    latitude: 39.7817,
    longitude: -89.6501,
};

#[derive(Default)]
struct Calls {
    geocode: usize,
    first_pages: usize,
    searches: Vec<TextSearchQuery>,
    details: Vec<String>,
}

/// Cells are handed out in the order their first page is requested; each cell
/// is a list of pages and every page but the last carries a token.
pub struct StubProvider {
    center: Option<Coordinate>,
    cells: Vec<Vec<Vec<RawCandidate>>>,
    failing_details: HashSet<String>,
    calls: Mutex<Calls>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            center: Some(CENTER),
            cells: Vec::new(),
            failing_details: HashSet::new(),
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn unresolvable() -> Self {
        Self {
            center: None,
            ..Self::new()
        }
    }

    pub fn with_cell(mut self, pages: Vec<Vec<RawCandidate>>) -> Self {
        self.cells.push(pages);
        self
    }

    pub fn with_failing_details(mut self, place_id: &str) -> Self {
        self.failing_details.insert(place_id.to_string());
        self
    }

    pub fn geocode_calls(&self) -> usize {
        self.calls.lock().geocode
    }

    pub fn search_calls(&self) -> Vec<TextSearchQuery> {
        self.calls.lock().searches.clone()
    }

    pub fn details_calls(&self) -> Vec<String> {
        self.calls.lock().details.clone()
    }
}

#[async_trait]
impl PlacesProvider for StubProvider {
    async fn geocode(&self, _address: &str) -> AppResult<GeocodeResult> {
        self.calls.lock().geocode += 1;
        Ok(match self.center {
            Some(center) => GeocodeResult {
                status: ApiStatus::Ok,
                location: Some(center),
            },
            None => GeocodeResult {
                status: ApiStatus::ZeroResults,
                location: None,
            },
        })
    }

    async fn text_search(&self, query: &TextSearchQuery) -> AppResult<SearchPage> {
        let (cell, page) = {
            let mut calls = self.calls.lock();
            calls.searches.push(query.clone());
            match query.page_token.as_deref() {
                None => {
                    calls.first_pages += 1;
                    (calls.first_pages - 1, 0)
                }
                Some(token) => parse_token(token),
            }
        };

        let Some(pages) = self.cells.get(cell) else {
            return Ok(SearchPage {
                status: ApiStatus::ZeroResults,
                candidates: Vec::new(),
                next_page_token: None,
            });
        };
        let candidates = pages.get(page).cloned().unwrap_or_default();
        let next_page_token = (page + 1 < pages.len()).then(|| format!("{cell}:{}", page + 1));
        Ok(SearchPage {
            status: ApiStatus::Ok,
            candidates,
            next_page_token,
        })
    }

    async fn place_details(&self, place_id: &str) -> AppResult<DetailsResult> {
        self.calls.lock().details.push(place_id.to_string());
        if self.failing_details.contains(place_id) {
            return Err(AppError::Config("simulated details outage".into()));
        }
        Ok(DetailsResult {
            status: ApiStatus::Ok,
            phone: Some(format!("+1 555 {place_id}")),
            website: Some(format!("https://{place_id}.example.com")),
        })
    }
}

fn parse_token(token: &str) -> (usize, usize) {
    let (cell, page) = token.split_once(':').expect("stub token");
    (cell.parse().expect("cell"), page.parse().expect("page"))
}

pub fn places(prefix: &str, range: std::ops::Range<usize>) -> Vec<RawCandidate> {
    range
        .map(|i| RawCandidate {
            external_id: format!("{prefix}-{i}"),
            name: format!("{prefix} place {i}"),
            formatted_address: format!("{i} Main St"),
            location: Coordinate::new(CENTER.latitude, CENTER.longitude),
        })
        .collect()
}

/// Three pages of twenty, the most the provider hands out for one query.
pub fn full_cell(prefix: &str) -> Vec<Vec<RawCandidate>> {
    vec![
        places(prefix, 0..20),
        places(prefix, 20..40),
        places(prefix, 40..60),
    ]
}

pub fn request(cap: i64) -> SearchRequest {
    SearchRequest::new(
        "",
        "Springfield",
        "bakery",
        cap,
        1000,
        SecretString::from("test-key".to_string()),
    )
    .expect("valid request")
}

pub fn fast_config() -> EngineConfig {
    EngineConfig {
        cursor_activation_delay_ms: 0,
        details_interval_ms: 0,
        search_interval_ms: 0,
        ..EngineConfig::default()
    }
}
