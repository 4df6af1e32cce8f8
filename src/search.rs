use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::errors::AppError;
use crate::model::{GridCell, PaginationCursor, RawCandidate};
use crate::pacing::{EndpointClass, Pacer};
use crate::places::{ApiStatus, PlacesProvider, TextSearchQuery};

/// Why a cell's pagination ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    CapReached,
    /// The caller asked the cell to stop (run cap met elsewhere or cancelled).
    Halted,
    Exhausted,
    EmptyPage,
    PageLimit,
    Status(ApiStatus),
    Unavailable(String),
}

impl StopReason {
    /// Whether the cell ended on provider trouble rather than running dry.
    pub fn is_abort(&self) -> bool {
        matches!(self, StopReason::Status(_) | StopReason::Unavailable(_))
    }
}

#[derive(Debug, Clone)]
pub struct CellScan {
    pub candidates: Vec<RawCandidate>,
    pub pages_requested: usize,
    pub stop: StopReason,
}

pub struct PaginatedSearchClient {
    provider: Arc<dyn PlacesProvider>,
    max_pages: usize,
}

impl PaginatedSearchClient {
    pub fn new(provider: Arc<dyn PlacesProvider>, max_pages: usize) -> Self {
        Self {
            provider,
            max_pages: max_pages.max(1),
        }
    }

    /// Runs one text query against `cell`, following page tokens until the
    /// cap, the last page, or a provider error.
    ///
    /// `halt` is polled before every page request and again after each token
    /// activation wait; once it returns true no further page is requested.
    /// Errors never escape: whatever was gathered before the failure is kept.
    pub async fn search(
        &self,
        text_query: &str,
        cell: &GridCell,
        per_cell_cap: usize,
        pacer: &Pacer,
        halt: &(dyn Fn() -> bool + Sync),
    ) -> CellScan {
        let mut candidates: Vec<RawCandidate> = Vec::new();
        let mut cursor: Option<PaginationCursor> = None;
        let mut pages_requested = 0;

        let stop = loop {
            if candidates.len() >= per_cell_cap {
                break StopReason::CapReached;
            }
            if pages_requested >= self.max_pages {
                break StopReason::PageLimit;
            }
            if halt() {
                break StopReason::Halted;
            }
            if let Some(cursor) = &cursor {
                pacer.activate(cursor).await;
                if halt() {
                    break StopReason::Halted;
                }
            }
            pacer.throttle(EndpointClass::TextSearch).await;

            let query = TextSearchQuery {
                text: text_query.to_string(),
                location: cell.center,
                radius_meters: cell.radius_meters,
                page_token: cursor.as_ref().map(|c| c.token.clone()),
            };
            pages_requested += 1;
            let page = match self.provider.text_search(&query).await {
                Ok(page) => page,
                Err(err) => {
                    warn!(
                        ?err,
                        page = pages_requested,
                        "text search failed; keeping partial cell"
                    );
                    break StopReason::Unavailable(err.to_string());
                }
            };

            if !page.status.is_success() {
                let err = AppError::ProviderQuotaOrStatusError {
                    endpoint: EndpointClass::TextSearch.as_str(),
                    status: page.status.to_string(),
                };
                warn!(%err, page = pages_requested, "stopping cell pagination");
                break StopReason::Status(page.status);
            }
            if page.candidates.is_empty() {
                break StopReason::EmptyPage;
            }

            trace!(
                page = pages_requested,
                results = page.candidates.len(),
                "text search page received"
            );
            let room = per_cell_cap - candidates.len();
            candidates.extend(page.candidates.into_iter().take(room));

            if candidates.len() >= per_cell_cap {
                break StopReason::CapReached;
            }
            match page.next_page_token {
                Some(token) => cursor = Some(PaginationCursor::issue(token)),
                None => break StopReason::Exhausted,
            }
        };

        debug!(
            lat = cell.center.latitude,
            lng = cell.center.longitude,
            pages = pages_requested,
            found = candidates.len(),
            stop = ?stop,
            "cell scan finished"
        );
        CellScan {
            candidates,
            pages_requested,
            stop,
        }
    }
}
