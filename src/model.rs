use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// `lat,lng` as the provider expects it in the `location` parameter.
    pub fn as_query_value(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// One user-initiated search. Read-only once built.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub category: String,
    pub location_hint: String,
    pub result_cap: usize,
    pub api_credential: SecretString,
}

impl SearchRequest {
    /// Validates and normalizes raw invocation fields.
    ///
    /// `city` and `category` must be non-blank; `district` may be blank. The
    /// cap is clamped to `[1, max_results]`.
    pub fn new(
        district: &str,
        city: &str,
        category: &str,
        result_cap: i64,
        max_results: usize,
        api_credential: SecretString,
    ) -> AppResult<Self> {
        let district = district.trim();
        let city = city.trim();
        let category = category.trim();
        if city.is_empty() || category.is_empty() {
            return Err(AppError::InvalidInput(
                "Please enter both city and company type.".into(),
            ));
        }

        let location_hint = if district.is_empty() {
            city.to_string()
        } else {
            format!("{district}, {city}")
        };
        let upper = max_results.max(1);
        let result_cap = usize::try_from(result_cap.max(1))
            .unwrap_or(upper)
            .min(upper);

        Ok(Self {
            category: category.to_string(),
            location_hint,
            result_cap,
            api_credential,
        })
    }

    pub fn text_query(&self) -> String {
        format!("{} in {}", self.category, self.location_hint)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub center: Coordinate,
    pub radius_meters: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub external_id: String,
    pub name: String,
    pub formatted_address: String,
    pub location: Coordinate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDetails {
    pub phone: String,
    pub website: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub external_id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub location: Coordinate,
}

impl EnrichedRecord {
    pub fn from_candidate(candidate: RawCandidate, details: ContactDetails) -> Self {
        Self {
            external_id: candidate.external_id,
            name: candidate.name,
            address: candidate.formatted_address,
            phone: details.phone,
            website: details.website,
            location: candidate.location,
        }
    }
}

/// Continuation handle for one cell's query.
///
/// The provider rejects a token presented before its activation window has
/// passed, and tokens go stale shortly after, so the issue time travels with it.
#[derive(Debug, Clone)]
pub struct PaginationCursor {
    pub token: String,
    pub issued_at: Instant,
}

impl PaginationCursor {
    pub fn issue(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            issued_at: Instant::now(),
        }
    }
}

/// Ordered by discovery, unique by `external_id`, never longer than the cap.
pub type ResultSet = Vec<EnrichedRecord>;
