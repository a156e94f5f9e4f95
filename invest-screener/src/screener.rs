//! Screener view wiring.
//!
//! Mount order matters: the URL is read into the store before the query
//! executor starts, so the first request already reflects a bookmarked
//! query instead of the defaults.

use std::sync::Arc;

use invest_common::ScreenerSettings;

use crate::api::ScreeningService;
use crate::catalog::FilterCatalog;
use crate::executor::{QueryExecutor, QueryState};
use crate::format::Pagination;
use crate::options::OptionsCache;
use crate::store::ScreenerStore;
use crate::url_sync::{Location, UrlSynchronizer};

/// One mounted screener view. Dropping it tears down every background task.
pub struct Screener {
    store: ScreenerStore,
    executor: QueryExecutor,
    url_sync: Option<UrlSynchronizer>,
    options: Arc<OptionsCache>,
}

impl Screener {
    /// Mount a view bound to `location`.
    pub fn mount(
        catalog: FilterCatalog,
        service: Arc<dyn ScreeningService>,
        location: Arc<dyn Location>,
        settings: &ScreenerSettings,
    ) -> Self {
        let store = ScreenerStore::new(catalog);
        let url_sync = UrlSynchronizer::start(store.clone(), location, settings.url_debounce());
        let executor = QueryExecutor::spawn(store.clone(), service.clone(), settings.query_debounce());

        Self {
            store,
            executor,
            url_sync: Some(url_sync),
            options: Arc::new(OptionsCache::new(service)),
        }
    }

    /// Mount a view with no URL binding.
    pub fn detached(catalog: FilterCatalog, service: Arc<dyn ScreeningService>, settings: &ScreenerSettings) -> Self {
        let store = ScreenerStore::new(catalog);
        let executor = QueryExecutor::spawn(store.clone(), service.clone(), settings.query_debounce());

        Self {
            store,
            executor,
            url_sync: None,
            options: Arc::new(OptionsCache::new(service)),
        }
    }

    pub fn store(&self) -> &ScreenerStore {
        &self.store
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub fn options(&self) -> &Arc<OptionsCache> {
        &self.options
    }

    pub fn query_state(&self) -> QueryState {
        self.executor.state()
    }

    /// Pagination for the current page and the last committed total.
    pub fn pagination(&self) -> Pagination {
        let state = self.store.snapshot();
        Pagination::new(state.page(), state.page_size(), self.executor.state().total_count)
    }

    /// Bypass the debounce window and query now.
    pub fn refresh(&self) {
        self.executor.refresh();
    }

    /// Stop every background task.
    pub fn unmount(&self) {
        self.executor.shutdown();
        if let Some(sync) = &self.url_sync {
            sync.shutdown();
        }
    }
}
