use std::sync::Arc;

use tracing::{trace, warn};

use crate::errors::AppError;
use crate::model::ContactDetails;
use crate::pacing::{EndpointClass, Pacer};
use crate::places::{ApiStatus, PlacesProvider};

/// Fetches phone and website for a discovered place.
///
/// Never fails: quota exhaustion, error statuses and transport failures all
/// degrade to empty fields so the record itself is kept.
pub struct DetailsEnricher {
    provider: Arc<dyn PlacesProvider>,
}

impl DetailsEnricher {
    pub fn new(provider: Arc<dyn PlacesProvider>) -> Self {
        Self { provider }
    }

    pub async fn enrich(&self, external_id: &str, pacer: &Pacer) -> ContactDetails {
        pacer.throttle(EndpointClass::Details).await;
        let result = match self.provider.place_details(external_id).await {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    ?err,
                    place_id = external_id,
                    "details lookup failed; keeping record without contact fields"
                );
                return ContactDetails::default();
            }
        };

        match result.status {
            ApiStatus::Ok => {
                trace!(place_id = external_id, "details resolved");
                ContactDetails {
                    phone: result.phone.unwrap_or_default(),
                    website: result.website.unwrap_or_default(),
                }
            }
            ApiStatus::OverQueryLimit => {
                let err = AppError::ProviderQuotaOnDetails {
                    place_id: external_id.to_string(),
                };
                warn!(%err, "details quota exhausted");
                ContactDetails::default()
            }
            status => {
                let err = AppError::ProviderQuotaOrStatusError {
                    endpoint: EndpointClass::Details.as_str(),
                    status: status.to_string(),
                };
                warn!(%err, place_id = external_id, "details lookup rejected");
                ContactDetails::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::errors::AppResult;
    use crate::places::{DetailsResult, GeocodeResult, SearchPage, TextSearchQuery};

    struct ScriptedDetails {
        responses: Mutex<Vec<AppResult<DetailsResult>>>,
    }

    #[async_trait]
    impl PlacesProvider for ScriptedDetails {
        async fn geocode(&self, _address: &str) -> AppResult<GeocodeResult> {
            unreachable!()
        }

        async fn text_search(&self, _query: &TextSearchQuery) -> AppResult<SearchPage> {
            unreachable!()
        }

        async fn place_details(&self, _place_id: &str) -> AppResult<DetailsResult> {
            self.responses.lock().remove(0)
        }
    }

    async fn enrich_once(response: AppResult<DetailsResult>) -> ContactDetails {
        let provider = Arc::new(ScriptedDetails {
            responses: Mutex::new(vec![response]),
        });
        let pacer = Pacer::new(Duration::ZERO, Duration::ZERO, Duration::ZERO);
        DetailsEnricher::new(provider).enrich("place-1", &pacer).await
    }

    #[tokio::test]
    async fn returns_phone_and_website() {
        let details = enrich_once(Ok(DetailsResult {
            status: ApiStatus::Ok,
            phone: Some("+1 555 0100".into()),
            website: None,
        }))
        .await;
        assert_eq!(details.phone, "+1 555 0100");
        assert_eq!(details.website, "");
    }

    #[tokio::test]
    async fn quota_exhaustion_degrades_to_empty() {
        let details = enrich_once(Ok(DetailsResult {
            status: ApiStatus::OverQueryLimit,
            phone: Some("ignored".into()),
            website: Some("ignored".into()),
        }))
        .await;
        assert_eq!(details, ContactDetails::default());
    }

    #[tokio::test]
    async fn other_status_degrades_to_empty() {
        let details = enrich_once(Ok(DetailsResult {
            status: ApiStatus::RequestDenied,
            phone: None,
            website: None,
        }))
        .await;
        assert_eq!(details, ContactDetails::default());
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_empty() {
        let details = enrich_once(Err(AppError::Config("timeout".into()))).await;
        assert_eq!(details, ContactDetails::default());
    }
}
