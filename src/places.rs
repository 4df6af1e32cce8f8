use std::fmt;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::trace;

use crate::config::AppConfig;
use crate::errors::AppResult;
use crate::model::{Coordinate, RawCandidate};

const GEOCODE_PATH: &str = "/geocode/json";
const TEXT_SEARCH_PATH: &str = "/place/textsearch/json";
const DETAILS_PATH: &str = "/place/details/json";
const DETAILS_FIELDS: &str = "formatted_phone_number,website";

/// Status string carried in every legacy Places/Geocoding response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    NotFound,
    Other(String),
}

impl ApiStatus {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim).unwrap_or_default() {
            "OK" => ApiStatus::Ok,
            "ZERO_RESULTS" => ApiStatus::ZeroResults,
            "OVER_QUERY_LIMIT" => ApiStatus::OverQueryLimit,
            "REQUEST_DENIED" => ApiStatus::RequestDenied,
            "INVALID_REQUEST" => ApiStatus::InvalidRequest,
            "NOT_FOUND" => ApiStatus::NotFound,
            "" => ApiStatus::Other("UNKNOWN_ERROR".into()),
            other => ApiStatus::Other(other.to_string()),
        }
    }

    /// `OK` and `ZERO_RESULTS` are the only non-error terminal states.
    pub fn is_success(&self) -> bool {
        matches!(self, ApiStatus::Ok | ApiStatus::ZeroResults)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ApiStatus::Ok => "OK",
            ApiStatus::ZeroResults => "ZERO_RESULTS",
            ApiStatus::OverQueryLimit => "OVER_QUERY_LIMIT",
            ApiStatus::RequestDenied => "REQUEST_DENIED",
            ApiStatus::InvalidRequest => "INVALID_REQUEST",
            ApiStatus::NotFound => "NOT_FOUND",
            ApiStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct GeocodeResult {
    pub status: ApiStatus,
    pub location: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSearchQuery {
    pub text: String,
    pub location: Coordinate,
    pub radius_meters: u32,
    pub page_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchPage {
    pub status: ApiStatus,
    pub candidates: Vec<RawCandidate>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DetailsResult {
    pub status: ApiStatus,
    pub phone: Option<String>,
    pub website: Option<String>,
}

/// The three outbound calls the engine makes against the places provider.
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn geocode(&self, address: &str) -> AppResult<GeocodeResult>;
    async fn text_search(&self, query: &TextSearchQuery) -> AppResult<SearchPage>;
    async fn place_details(&self, place_id: &str) -> AppResult<DetailsResult>;
}

pub struct HttpPlacesProvider {
    http: reqwest::Client,
    api_base: String,
    api_key: SecretString,
}

impl HttpPlacesProvider {
    pub fn new(config: &AppConfig, api_key: SecretString) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("maps-grid-scraper/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_base: config.maps_api_base.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get_json<T>(&self, path: &str, params: &[(&str, &str)]) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.api_base, path);
        trace!(%url, "places request");
        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.expose_secret())])
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl PlacesProvider for HttpPlacesProvider {
    async fn geocode(&self, address: &str) -> AppResult<GeocodeResult> {
        let parsed: GeocodeResponse = self
            .get_json(GEOCODE_PATH, &[("address", address)])
            .await?;
        Ok(parsed.into_result())
    }

    async fn text_search(&self, query: &TextSearchQuery) -> AppResult<SearchPage> {
        let location = query.location.as_query_value();
        let radius = query.radius_meters.to_string();
        let mut params = vec![
            ("query", query.text.as_str()),
            ("location", location.as_str()),
            ("radius", radius.as_str()),
        ];
        if let Some(token) = query.page_token.as_deref() {
            params.push(("pagetoken", token));
        }
        let parsed: TextSearchResponse = self.get_json(TEXT_SEARCH_PATH, &params).await?;
        Ok(parsed.into_page())
    }

    async fn place_details(&self, place_id: &str) -> AppResult<DetailsResult> {
        let parsed: DetailsResponse = self
            .get_json(
                DETAILS_PATH,
                &[("place_id", place_id), ("fields", DETAILS_FIELDS)],
            )
            .await?;
        Ok(parsed.into_result())
    }
}

// Wire shapes. Every field goes through a lenient deserializer so that a
// missing or wrongly typed value degrades to empty instead of rejecting the
// whole body, and one malformed entry never costs the rest of its page.

#[derive(Debug, Default, Deserialize)]
struct GeocodeResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    results: Vec<GeocodeEntry>,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    #[serde(default, deserialize_with = "lenient")]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(default, deserialize_with = "lenient")]
    location: Option<WireLocation>,
}

#[derive(Debug, Deserialize)]
struct WireLocation {
    #[serde(default, deserialize_with = "lenient_f64")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    lng: Option<f64>,
}

impl WireLocation {
    fn to_coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.lat?, self.lng?))
    }
}

impl GeocodeResponse {
    fn into_result(self) -> GeocodeResult {
        let location = self
            .results
            .first()
            .and_then(|entry| entry.geometry.as_ref())
            .and_then(|geometry| geometry.location.as_ref())
            .and_then(WireLocation::to_coordinate);
        GeocodeResult {
            status: ApiStatus::parse(self.status.as_deref()),
            location,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TextSearchResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    results: Vec<WirePlace>,
    #[serde(default, deserialize_with = "lenient_string")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePlace {
    #[serde(default, deserialize_with = "lenient_string")]
    place_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    formatted_address: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    geometry: Option<Geometry>,
}

impl WirePlace {
    fn into_candidate(self) -> Option<RawCandidate> {
        let external_id = self.place_id.filter(|id| !id.trim().is_empty())?;
        let location = self
            .geometry
            .as_ref()
            .and_then(|geometry| geometry.location.as_ref())
            .and_then(WireLocation::to_coordinate)
            .unwrap_or(Coordinate::new(0.0, 0.0));
        Some(RawCandidate {
            external_id,
            name: self.name.unwrap_or_default(),
            formatted_address: self.formatted_address.unwrap_or_default(),
            location,
        })
    }
}

impl TextSearchResponse {
    fn into_page(self) -> SearchPage {
        let total = self.results.len();
        let candidates: Vec<RawCandidate> = self
            .results
            .into_iter()
            .filter_map(WirePlace::into_candidate)
            .collect();
        if candidates.len() < total {
            trace!(
                skipped = total - candidates.len(),
                "dropped search results without place_id"
            );
        }
        SearchPage {
            status: ApiStatus::parse(self.status.as_deref()),
            candidates,
            next_page_token: self.next_page_token.filter(|token| !token.is_empty()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DetailsResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    result: Option<DetailsFields>,
}

#[derive(Debug, Deserialize)]
struct DetailsFields {
    #[serde(default, deserialize_with = "lenient_string")]
    formatted_phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    website: Option<String>,
}

impl DetailsResponse {
    fn into_result(self) -> DetailsResult {
        let (phone, website) = match self.result {
            Some(fields) => (fields.formatted_phone_number, fields.website),
            None => (None, None),
        };
        DetailsResult {
            status: ApiStatus::parse(self.status.as_deref()),
            phone,
            website,
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let entries = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(entries)) => entries,
        _ => return Ok(Vec::new()),
    };
    let total = entries.len();
    let parsed: Vec<T> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();
    if parsed.len() < total {
        trace!(skipped = total - parsed.len(), "dropped malformed entries");
    }
    Ok(parsed)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(raw)) => Some(raw),
        Some(Value::Number(raw)) => Some(raw.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(raw)) => raw.as_f64(),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(value.filter(|v| v.is_finite()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_known_and_unknown_statuses() {
        assert_eq!(ApiStatus::parse(Some("OK")), ApiStatus::Ok);
        assert_eq!(ApiStatus::parse(Some("ZERO_RESULTS")), ApiStatus::ZeroResults);
        assert!(ApiStatus::parse(Some("ZERO_RESULTS")).is_success());
        assert!(!ApiStatus::parse(Some("OVER_QUERY_LIMIT")).is_success());
        assert_eq!(ApiStatus::parse(None).as_str(), "UNKNOWN_ERROR");
        assert_eq!(ApiStatus::parse(Some("WEIRD")).to_string(), "WEIRD");
    }

    #[test]
    fn search_page_tolerates_missing_fields() {
        let body = json!({
            "status": "OK",
            "results": [
                { "place_id": "a", "name": "Alpha" },
                { "name": "No id" },
                {
                    "place_id": "b",
                    "formatted_address": "1 Main St",
                    "geometry": { "location": { "lat": 1.5, "lng": 2.5 } }
                }
            ],
            "next_page_token": ""
        });
        let parsed: TextSearchResponse = serde_json::from_value(body).unwrap();
        let page = parsed.into_page();

        assert_eq!(page.status, ApiStatus::Ok);
        assert!(page.next_page_token.is_none());
        assert_eq!(page.candidates.len(), 2);
        assert_eq!(page.candidates[0].formatted_address, "");
        assert_eq!(page.candidates[1].location, Coordinate::new(1.5, 2.5));
    }

    #[test]
    fn malformed_entries_do_not_reject_the_page() {
        let body = json!({
            "status": "OK",
            "results": [
                { "place_id": "a", "geometry": { "location": { "lat": 1.0, "lng": 2.0 } } },
                { "place_id": "b", "geometry": { "location": { "lat": "39.7", "lng": -89.6 } } },
                { "place_id": 42, "name": ["not", "a", "string"] },
                { "place_id": "c", "geometry": "nowhere" },
                "not an object"
            ],
            "next_page_token": 7
        });
        let parsed: TextSearchResponse = serde_json::from_value(body).unwrap();
        let page = parsed.into_page();

        let ids: Vec<&str> = page
            .candidates
            .iter()
            .map(|c| c.external_id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b", "42", "c"]);
        assert_eq!(page.candidates[1].location, Coordinate::new(39.7, -89.6));
        assert_eq!(page.candidates[2].name, "");
        assert_eq!(page.candidates[3].location, Coordinate::new(0.0, 0.0));
        assert_eq!(page.next_page_token.as_deref(), Some("7"));
    }

    #[test]
    fn null_results_parse_as_empty() {
        let parsed: TextSearchResponse =
            serde_json::from_value(json!({ "status": "ZERO_RESULTS", "results": null })).unwrap();
        let page = parsed.into_page();
        assert_eq!(page.status, ApiStatus::ZeroResults);
        assert!(page.candidates.is_empty());

        let parsed: DetailsResponse = serde_json::from_value(json!({
            "status": "OK",
            "result": { "formatted_phone_number": 5550100, "website": null }
        }))
        .unwrap();
        let result = parsed.into_result();
        assert_eq!(result.phone.as_deref(), Some("5550100"));
        assert!(result.website.is_none());
    }

    #[test]
    fn geocode_without_geometry_has_no_location() {
        let parsed: GeocodeResponse =
            serde_json::from_value(json!({ "status": "OK", "results": [{}] })).unwrap();
        let result = parsed.into_result();
        assert_eq!(result.status, ApiStatus::Ok);
        assert!(result.location.is_none());
    }

    #[test]
    fn details_without_result_is_empty() {
        let parsed: DetailsResponse =
            serde_json::from_value(json!({ "status": "NOT_FOUND" })).unwrap();
        let result = parsed.into_result();
        assert_eq!(result.status, ApiStatus::NotFound);
        assert!(result.phone.is_none());
        assert!(result.website.is_none());
    }
}
