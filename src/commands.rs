use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::engine::ProgressObserver;
use crate::errors::AppError;
use crate::model::ResultSet;
use crate::AppState;

const GEOCODE_FAILURE_COPY: &str = "Could not obtain location coordinates.";

/// Fields posted by the search form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchInput {
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, alias = "company_type")]
    pub category: String,
    #[serde(default, alias = "result_limit", deserialize_with = "loose_integer")]
    pub result_cap: Option<i64>,
}

/// Form posts carry numbers as strings; accept either, truncating fractions.
/// Blank or non-numeric values fall back to the configured default.
fn loose_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(raw)) => raw.as_i64().or_else(|| raw.as_f64().map(|v| v as i64)),
        Some(Value::String(raw)) => {
            let raw = raw.trim();
            raw.parse::<i64>()
                .ok()
                .or_else(|| raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
        }
        _ => None,
    })
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SearchPayload {
    Success {
        success: bool,
        count: usize,
        data: ResultSet,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl SearchPayload {
    pub fn success(data: ResultSet) -> Self {
        SearchPayload::Success {
            success: true,
            count: data.len(),
            data,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        SearchPayload::Failure {
            success: false,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SearchPayload::Success { .. })
    }
}

impl From<&AppError> for SearchPayload {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::GeoResolutionFailed { .. } => SearchPayload::failure(GEOCODE_FAILURE_COPY),
            other => SearchPayload::failure(other.to_string()),
        }
    }
}

/// Single search invocation consumed by the presentation layer.
pub async fn scrape_places(
    state: &AppState,
    input: SearchInput,
    observer: Option<ProgressObserver>,
    cancel_flag: Option<Arc<AtomicBool>>,
) -> SearchPayload {
    match state.search(input, observer, cancel_flag).await {
        Ok(outcome) => SearchPayload::success(outcome.records),
        Err(err) => {
            warn!(?err, terminal = err.is_terminal(), "search rejected");
            SearchPayload::from(&err)
        }
    }
}
