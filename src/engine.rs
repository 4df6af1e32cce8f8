use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::config::EngineConfig;
use crate::dedup::Deduplicator;
use crate::details::DetailsEnricher;
use crate::errors::AppResult;
use crate::geo::GeoResolver;
use crate::grid::GridPlanner;
use crate::model::{EnrichedRecord, GridCell, ResultSet, SearchRequest};
use crate::pacing::Pacer;
use crate::places::PlacesProvider;
use crate::search::PaginatedSearchClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    ResolvingLocation,
    Planning,
    ScanningCell,
    Enriching,
    Done,
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EngineState::ResolvingLocation => "resolving_location",
            EngineState::Planning => "planning",
            EngineState::ScanningCell => "scanning_cell",
            EngineState::Enriching => "enriching",
            EngineState::Done => "done",
            EngineState::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchProgress {
    pub cells_completed: usize,
    pub cells_total: usize,
    pub records_found: usize,
}

pub type ProgressObserver = Arc<dyn Fn(SearchProgress) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    pub records: ResultSet,
    pub cells_total: usize,
    pub cells_scanned: usize,
    pub cancelled: bool,
}

/// Shared state of one run. Lives exactly as long as the run.
struct RunState {
    cap: usize,
    seen: Deduplicator,
    reserved: AtomicUsize,
    records: Mutex<ResultSet>,
    cells_completed: AtomicUsize,
    cells_scanned: AtomicUsize,
}

impl RunState {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            seen: Deduplicator::new(),
            reserved: AtomicUsize::new(0),
            records: Mutex::new(Vec::new()),
            cells_completed: AtomicUsize::new(0),
            cells_scanned: AtomicUsize::new(0),
        }
    }

    fn cap_reached(&self) -> bool {
        self.reserved.load(Ordering::SeqCst) >= self.cap
    }

    /// Claims one output slot. Claimed slots always produce a record, so the
    /// cap can never be overshot by concurrent cells.
    fn try_reserve(&self) -> bool {
        self.reserved
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |taken| {
                (taken < self.cap).then_some(taken + 1)
            })
            .is_ok()
    }
}

pub struct AggregationEngine {
    resolver: GeoResolver,
    planner: GridPlanner,
    searcher: PaginatedSearchClient,
    enricher: DetailsEnricher,
    pacer: Pacer,
    per_cell_cap: usize,
    max_concurrent_cells: usize,
}

impl AggregationEngine {
    pub fn new(provider: Arc<dyn PlacesProvider>, config: &EngineConfig) -> Self {
        Self {
            resolver: GeoResolver::new(Arc::clone(&provider)),
            planner: GridPlanner::from_config(config),
            searcher: PaginatedSearchClient::new(
                Arc::clone(&provider),
                config.max_pages_per_cell,
            ),
            enricher: DetailsEnricher::new(provider),
            pacer: Pacer::from_config(config),
            per_cell_cap: config.per_cell_cap.max(1),
            max_concurrent_cells: config.max_concurrent_cells.max(1),
        }
    }

    /// Resolve, plan, then scan cells in row-major order, enriching each newly
    /// seen place inline until the cap is met or the cells run out.
    ///
    /// Only a geocode failure is returned as an error. Cancellation stops new
    /// cells and enrichments and returns what was gathered so far.
    pub async fn run(
        &self,
        request: &SearchRequest,
        observer: Option<ProgressObserver>,
        cancel_flag: Option<Arc<AtomicBool>>,
    ) -> AppResult<AggregationOutcome> {
        transition(EngineState::ResolvingLocation);
        let center = match self
            .resolver
            .resolve(&request.location_hint, &self.pacer)
            .await
        {
            Ok(center) => center,
            Err(err) => {
                transition(EngineState::Failed);
                return Err(err);
            }
        };

        transition(EngineState::Planning);
        let cells = self.planner.plan(center, request.result_cap);
        let cells_total = cells.len();
        debug!(
            cells = cells_total,
            cap = request.result_cap,
            "planned search grid"
        );

        let state = RunState::new(request.result_cap);
        let text_query = request.text_query();
        let is_cancelled = || {
            cancel_flag
                .as_ref()
                .map(|flag| flag.load(Ordering::SeqCst))
                .unwrap_or(false)
        };

        stream::iter(cells.into_iter().enumerate())
            .map(|(index, cell)| {
                let state = &state;
                let is_cancelled = &is_cancelled;
                let text_query = text_query.as_str();
                let observer = observer.clone();
                async move {
                    self.scan_cell(index, &cell, text_query, state, is_cancelled)
                        .await;
                    let cells_completed =
                        state.cells_completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(callback) = &observer {
                        callback(SearchProgress {
                            cells_completed,
                            cells_total,
                            records_found: state.records.lock().len(),
                        });
                    }
                }
            })
            .buffer_unordered(self.max_concurrent_cells)
            .collect::<Vec<()>>()
            .await;

        let cancelled = is_cancelled();
        let records = std::mem::take(&mut *state.records.lock());
        transition(EngineState::Done);
        info!(
            records = records.len(),
            cap = request.result_cap,
            cells_total,
            cells_scanned = state.cells_scanned.load(Ordering::SeqCst),
            cancelled,
            "aggregation finished"
        );

        Ok(AggregationOutcome {
            records,
            cells_total,
            cells_scanned: state.cells_scanned.load(Ordering::SeqCst),
            cancelled,
        })
    }

    async fn scan_cell(
        &self,
        index: usize,
        cell: &GridCell,
        text_query: &str,
        state: &RunState,
        is_cancelled: &(dyn Fn() -> bool + Sync),
    ) {
        if state.cap_reached() || is_cancelled() {
            trace!(cell = index, "skipping cell");
            return;
        }

        transition(EngineState::ScanningCell);
        state.cells_scanned.fetch_add(1, Ordering::SeqCst);
        let halt = || state.cap_reached() || is_cancelled();
        let scan = self
            .searcher
            .search(text_query, cell, self.per_cell_cap, &self.pacer, &halt)
            .await;
        if scan.stop.is_abort() {
            debug!(
                cell = index,
                stop = ?scan.stop,
                kept = scan.candidates.len(),
                "cell aborted early"
            );
        }

        for candidate in scan.candidates {
            if is_cancelled() || state.cap_reached() {
                break;
            }
            if !state.seen.admit(&candidate.external_id) {
                trace!(
                    cell = index,
                    place_id = %candidate.external_id,
                    "duplicate skipped"
                );
                continue;
            }
            if !state.try_reserve() {
                break;
            }

            transition(EngineState::Enriching);
            let details = self
                .enricher
                .enrich(&candidate.external_id, &self.pacer)
                .await;
            state
                .records
                .lock()
                .push(EnrichedRecord::from_candidate(candidate, details));
        }
    }
}

fn transition(next: EngineState) {
    debug!(state = %next, "engine state");
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;

    type Recorded = Arc<Mutex<Vec<(Level, String)>>>;

    struct StateRecorder(Recorded);

    struct StateField(Option<String>);

    impl Visit for StateField {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "state" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: Subscriber> Layer<S> for StateRecorder {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut field = StateField(None);
            event.record(&mut field);
            if let Some(state) = field.0 {
                self.0.lock().push((*event.metadata().level(), state));
            }
        }
    }

    #[test]
    fn every_state_transition_logs_at_debug() {
        let recorded: Recorded = Arc::default();
        let subscriber =
            tracing_subscriber::registry().with(StateRecorder(Arc::clone(&recorded)));

        tracing::subscriber::with_default(subscriber, || {
            for state in [
                EngineState::ResolvingLocation,
                EngineState::Planning,
                EngineState::ScanningCell,
                EngineState::Enriching,
                EngineState::Done,
                EngineState::Failed,
            ] {
                transition(state);
            }
        });

        let recorded = recorded.lock();
        let states: Vec<&str> = recorded.iter().map(|(_, state)| state.as_str()).collect();
        assert_eq!(
            states,
            [
                "resolving_location",
                "planning",
                "scanning_cell",
                "enriching",
                "done",
                "failed"
            ]
        );
        assert!(recorded.iter().all(|(level, _)| *level == Level::DEBUG));
    }
}
