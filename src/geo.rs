use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::model::Coordinate;
use crate::pacing::{EndpointClass, Pacer};
use crate::places::{ApiStatus, PlacesProvider};

pub struct GeoResolver {
    provider: Arc<dyn PlacesProvider>,
}

impl GeoResolver {
    pub fn new(provider: Arc<dyn PlacesProvider>) -> Self {
        Self { provider }
    }

    /// Single geocode call; any failure is terminal for the search.
    pub async fn resolve(&self, location_hint: &str, pacer: &Pacer) -> AppResult<Coordinate> {
        pacer.throttle(EndpointClass::Geocode).await;
        let result = self.provider.geocode(location_hint).await.map_err(|err| {
            warn!(?err, location = location_hint, "geocode request failed");
            AppError::GeoResolutionFailed {
                location: location_hint.to_string(),
                reason: err.to_string(),
            }
        })?;

        if result.status != ApiStatus::Ok {
            warn!(
                status = %result.status,
                location = location_hint,
                "geocode returned non-OK status"
            );
            return Err(AppError::GeoResolutionFailed {
                location: location_hint.to_string(),
                reason: format!("provider status {}", result.status),
            });
        }

        let center = result.location.ok_or_else(|| AppError::GeoResolutionFailed {
            location: location_hint.to_string(),
            reason: "response carried no geometry".into(),
        })?;
        debug!(
            location = location_hint,
            lat = center.latitude,
            lng = center.longitude,
            "resolved search center"
        );
        Ok(center)
    }
}
