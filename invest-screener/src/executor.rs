//! Debounced, race-safe execution of screener queries.
//!
//! A background task watches the store. Any change to the query inputs
//! re-arms a debounce deadline; when it expires the current state is turned
//! into a request and sent. Starting a request cancels the previous one, and
//! every request carries a generation number so that only the most recent
//! one may commit results, loading, or error state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ScreeningService;
use crate::model::Stock;
use crate::store::{ScreenerState, ScreenerStore};

/// Default quiet period after the last change before a query fires.
pub const DEFAULT_QUERY_DEBOUNCE: Duration = Duration::from_millis(400);

/// Outcome of the most recent authoritative query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    /// Rows of the current page, replaced wholesale on success
    pub results: Vec<Stock>,
    pub total_count: u64,
    pub is_loading: bool,
    /// Display message of the last failure; earlier results stay in place
    pub error: Option<String>,
}

enum Command {
    Refresh,
}

/// The authoritative request slot.
#[derive(Default)]
struct InFlight {
    generation: u64,
    token: Option<CancellationToken>,
}

/// Handle to the background query task.
///
/// Dropping the handle stops the task and abandons any in-flight request.
pub struct QueryExecutor {
    state: watch::Receiver<QueryState>,
    commands: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
}

impl QueryExecutor {
    /// Start watching `store`. The first query fires one debounce window
    /// after spawning.
    pub fn spawn(store: ScreenerStore, service: Arc<dyn ScreeningService>, debounce: Duration) -> Self {
        let (state_tx, state_rx) = watch::channel(QueryState::default());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let worker = Worker {
            store,
            service,
            debounce,
            state: Arc::new(state_tx),
            in_flight: Arc::new(Mutex::new(InFlight::default())),
            shutdown: shutdown.clone(),
        };
        let changes = worker.store.subscribe();
        tokio::spawn(worker.run(changes, command_rx));

        Self {
            state: state_rx,
            commands: command_tx,
            shutdown,
        }
    }

    /// Current query state.
    pub fn state(&self) -> QueryState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.state.clone()
    }

    /// Fetch now, skipping the debounce window.
    pub fn refresh(&self) {
        if self.commands.send(Command::Refresh).is_err() {
            warn!("Refresh requested after the query executor stopped");
        }
    }

    /// Stop the task and cancel any pending timer or request.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for QueryExecutor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct Worker {
    store: ScreenerStore,
    service: Arc<dyn ScreeningService>,
    debounce: Duration,
    state: Arc<watch::Sender<QueryState>>,
    in_flight: Arc<Mutex<InFlight>>,
    shutdown: CancellationToken,
}

fn lock(in_flight: &Mutex<InFlight>) -> MutexGuard<'_, InFlight> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Worker {
    async fn run(
        self,
        mut changes: watch::Receiver<ScreenerState>,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let mut observed: ScreenerState = changes.borrow_and_update().clone();
        let mut deadline = Some(Instant::now() + self.debounce);

        debug!(debounce_ms = self.debounce.as_millis() as u64, "Query executor started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,

                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let next = changes.borrow_and_update().clone();
                    if !next.same_query_inputs(&observed) {
                        observed = next;
                        deadline = Some(Instant::now() + self.debounce);
                    }
                }

                Some(command) = commands.recv() => match command {
                    Command::Refresh => {
                        deadline = None;
                        self.fetch();
                    }
                },

                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    self.fetch();
                }
            }
        }

        if let Some(token) = lock(&self.in_flight).token.take() {
            token.cancel();
        }
        info!("Query executor stopped");
    }

    /// Issue a request for the current store state, superseding any other.
    fn fetch(&self) {
        let request = self.store.derive_request();
        let token = self.shutdown.child_token();

        let generation = {
            let mut in_flight = lock(&self.in_flight);
            if let Some(previous) = in_flight.token.replace(token.clone()) {
                previous.cancel();
                debug!(generation = in_flight.generation, "Superseded in-flight query");
            }
            in_flight.generation += 1;
            in_flight.generation
        };

        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
        debug!(
            generation,
            sort_by = %request.sort_by,
            offset = request.offset,
            limit = request.limit,
            filters = request.filters.len(),
            "Issuing screener query"
        );

        let service = Arc::clone(&self.service);
        let state = Arc::clone(&self.state);
        let in_flight = Arc::clone(&self.in_flight);

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    debug!(generation, "Query cancelled");
                    return;
                }
                outcome = service.screen_stocks(&request) => outcome,
            };

            let mut slot = lock(&in_flight);
            if slot.generation != generation {
                debug!(generation, current = slot.generation, "Discarding stale response");
                return;
            }
            slot.token = None;

            state.send_modify(|s| {
                s.is_loading = false;
                match outcome {
                    Ok(response) => {
                        debug!(generation, rows = response.results.len(), total = response.total_count, "Query committed");
                        s.results = response.results;
                        s.total_count = response.total_count;
                    }
                    Err(err) if err.is_cancelled() => {}
                    Err(err) => {
                        warn!(generation, error = %err, "Screener query failed");
                        s.error = Some(err.user_message());
                    }
                }
            });
        });
    }
}
