//! Keeps an address-bar style query string in step with the store.
//!
//! Recognized parameters are read once at start-up, before anything else
//! touches the store. After that the flow is one-way: store changes are
//! coalesced over a debounce window and the latest state is written back
//! with replace semantics.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::store::{has_recognized_params, ScreenerState, ScreenerStore};

/// Default quiet period before the query string is rewritten.
pub const DEFAULT_URL_DEBOUNCE: Duration = Duration::from_millis(300);

/// Something holding a query string, such as a browser location.
pub trait Location: Send + Sync {
    /// Current query string, with or without a leading `?`.
    fn query(&self) -> String;

    /// Replace the query string in place, without adding a history entry.
    fn replace_query(&self, query: &str);
}

/// In-process [`Location`] that counts its writes.
#[derive(Debug, Default)]
pub struct MemoryLocation {
    inner: Mutex<(String, usize)>,
}

impl MemoryLocation {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new((query.into(), 0)),
        }
    }

    /// Number of `replace_query` calls so far.
    pub fn replace_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).1
    }
}

impl Location for MemoryLocation {
    fn query(&self) -> String {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).0.clone()
    }

    fn replace_query(&self, query: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.0 = query.to_string();
        inner.1 += 1;
    }
}

/// Handle to the background URL writer. Dropping it stops the writer.
pub struct UrlSynchronizer {
    shutdown: CancellationToken,
}

impl UrlSynchronizer {
    /// Hydrate `store` from `location`, then mirror every later change back.
    pub fn start(store: ScreenerStore, location: Arc<dyn Location>, debounce: Duration) -> Self {
        Self::hydrate(&store, location.as_ref());

        let shutdown = CancellationToken::new();
        let mut changes = store.subscribe();
        changes.borrow_and_update();
        tokio::spawn(write_back(store, changes, location, debounce, shutdown.clone()));
        Self { shutdown }
    }

    /// One-time read of the location into the store.
    ///
    /// Returns true when the location carried recognized parameters.
    pub fn hydrate(store: &ScreenerStore, location: &dyn Location) -> bool {
        let query = location.query();
        if !has_recognized_params(&query, store.catalog()) {
            return false;
        }
        let applied = store.hydrate_from_query_string(&query);
        info!(query = %query, applied, "Hydrated screener state from URL");
        true
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for UrlSynchronizer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn write_back(
    store: ScreenerStore,
    mut changes: watch::Receiver<ScreenerState>,
    location: Arc<dyn Location>,
    debounce: Duration,
    shutdown: CancellationToken,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                changes.borrow_and_update();
                deadline = Some(Instant::now() + debounce);
            }

            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                let query = store.to_query_string();
                let current = location.query();
                if current.strip_prefix('?').unwrap_or(&current) != query {
                    debug!(query = %query, "Replacing URL query");
                    location.replace_query(&query);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FilterCatalog;

    fn store() -> ScreenerStore {
        ScreenerStore::new(FilterCatalog::standard())
    }

    #[test]
    fn test_hydrate_only_with_recognized_params() {
        let store = store();
        assert!(!UrlSynchronizer::hydrate(&store, &MemoryLocation::new("?ref=home")));
        assert_eq!(store.snapshot().page(), 1);

        assert!(UrlSynchronizer::hydrate(&store, &MemoryLocation::new("?sort=pe_ratio&order=desc")));
        assert_eq!(store.snapshot().sort_field(), "pe_ratio");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_changes_coalesce_into_one_write() {
        let store = store();
        let location = Arc::new(MemoryLocation::default());
        let _sync = UrlSynchronizer::start(store.clone(), location.clone(), DEFAULT_URL_DEBOUNCE);

        store.set_primary_exchanges(vec!["NYSE".into()]);
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.set_primary_sectors(vec!["Energy".into()]);
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.set_page(2);

        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(location.replace_count(), 1);
        assert_eq!(location.query(), "exchange=NYSE&sector=Energy&page=2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_query_is_not_rewritten() {
        let store = store();
        let location = Arc::new(MemoryLocation::new("?sector=Energy"));
        let _sync = UrlSynchronizer::start(store.clone(), location.clone(), DEFAULT_URL_DEBOUNCE);

        store.open_filter_edit("pe_ratio");
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(location.replace_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drops_pending_write() {
        let store = store();
        let location = Arc::new(MemoryLocation::default());
        let sync = UrlSynchronizer::start(store.clone(), location.clone(), DEFAULT_URL_DEBOUNCE);

        store.set_page(4);
        sync.shutdown();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(location.replace_count(), 0);
    }
}
