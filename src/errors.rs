use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("could not resolve location \"{location}\": {reason}")]
    GeoResolutionFailed { location: String, reason: String },
    #[error("places provider unavailable: {0}")]
    ProviderUnavailable(#[from] reqwest::Error),
    #[error("places {endpoint} returned status {status}")]
    ProviderQuotaOrStatusError {
        endpoint: &'static str,
        status: String,
    },
    #[error("details quota exhausted for place {place_id}")]
    ProviderQuotaOnDetails { place_id: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Config(String),
}

impl AppError {
    /// Errors that abort a whole search rather than a single cell or record.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppError::InvalidInput(_) | AppError::GeoResolutionFailed { .. } | AppError::Config(_)
        )
    }
}
