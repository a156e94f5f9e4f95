//! Session cache for the dropdown vocabulary.
//!
//! The options are fetched at most once per session. Callers that arrive
//! while the fetch is in flight await the same shared future, so they all
//! observe one network call and the same `Arc`. A failure is cached too and
//! only [`OptionsCache::retry`] clears it.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::api::{ApiError, ScreeningService};
use crate::model::ScreenerOptions;

type OptionsResult = Result<Arc<ScreenerOptions>, ApiError>;
type SharedFetch = Shared<BoxFuture<'static, OptionsResult>>;

enum Slot {
    Empty,
    Pending(SharedFetch),
    Ready(Arc<ScreenerOptions>),
    Failed(ApiError),
}

struct Inner {
    /// Bumped by `retry` so a superseded fetch cannot commit.
    epoch: u64,
    slot: Slot,
}

/// Observable state of the cache.
#[derive(Debug, Clone, Default)]
pub struct OptionsState {
    pub options: Option<Arc<ScreenerOptions>>,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct OptionsCache {
    service: Arc<dyn ScreeningService>,
    inner: Mutex<Inner>,
}

impl OptionsCache {
    pub fn new(service: Arc<dyn ScreeningService>) -> Self {
        Self {
            service,
            inner: Mutex::new(Inner {
                epoch: 0,
                slot: Slot::Empty,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached options, fetching them on first use.
    pub async fn fetch(&self) -> OptionsResult {
        let (epoch, fetch) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            match &inner.slot {
                Slot::Ready(options) => return Ok(options.clone()),
                Slot::Failed(err) => return Err(err.clone()),
                Slot::Pending(fetch) => (inner.epoch, fetch.clone()),
                Slot::Empty => {
                    let fetch = self.start_fetch();
                    inner.slot = Slot::Pending(fetch.clone());
                    (inner.epoch, fetch)
                }
            }
        };

        let result = fetch.await;

        let mut inner = self.lock();
        if inner.epoch == epoch && matches!(inner.slot, Slot::Pending(_)) {
            inner.slot = match &result {
                Ok(options) => Slot::Ready(options.clone()),
                Err(err) => Slot::Failed(err.clone()),
            };
        }
        result
    }

    /// Discard the cached value or error and fetch again.
    pub async fn retry(&self) -> OptionsResult {
        {
            let mut inner = self.lock();
            inner.epoch += 1;
            inner.slot = Slot::Empty;
        }
        debug!("Options cache cleared");
        self.fetch().await
    }

    pub fn state(&self) -> OptionsState {
        let inner = self.lock();
        match &inner.slot {
            Slot::Empty => OptionsState::default(),
            Slot::Pending(_) => OptionsState {
                is_loading: true,
                ..Default::default()
            },
            Slot::Ready(options) => OptionsState {
                options: Some(options.clone()),
                ..Default::default()
            },
            Slot::Failed(err) => OptionsState {
                error: Some(err.user_message()),
                ..Default::default()
            },
        }
    }

    fn start_fetch(&self) -> SharedFetch {
        let service = Arc::clone(&self.service);
        async move {
            debug!("Fetching screener options");
            match service.fetch_options().await {
                Ok(options) => {
                    debug!(
                        countries = options.countries.len(),
                        exchanges = options.exchanges.len(),
                        sectors = options.sectors.len(),
                        "Screener options loaded"
                    );
                    Ok(Arc::new(options))
                }
                Err(err) => {
                    warn!(error = %err, "Failed to load screener options");
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }
}
