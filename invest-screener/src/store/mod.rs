//! Observable screener store.
//!
//! [`ScreenerStore`] owns the single [`ScreenerState`] of a screener view and
//! publishes every change through a `tokio::sync::watch` channel. Each
//! mutator runs under the channel's lock, so a filter change and its page
//! reset become visible together, and a call that changes nothing does not
//! wake subscribers.

mod query_string;
mod state;

pub use query_string::{
    format_range, has_recognized_params, parse_boolean, parse_filter_value, parse_list,
    parse_page, parse_page_size, parse_query_string, parse_range, parse_ratings,
    to_query_string, QueryPatch,
};
pub use state::{ScreenerState, DEFAULT_PAGE_SIZE, DEFAULT_SORT_FIELD, PAGE_SIZE_OPTIONS};

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::catalog::FilterCatalog;
use crate::model::{FilterValue, RatingLetter, ScreenerQueryRequest, SortDirection};

/// Shared handle to a screener view's state.
///
/// Cloning is cheap; all clones see the same state.
#[derive(Clone)]
pub struct ScreenerStore {
    catalog: FilterCatalog,
    state: Arc<watch::Sender<ScreenerState>>,
}

impl ScreenerStore {
    pub fn new(catalog: FilterCatalog) -> Self {
        Self::with_state(catalog, ScreenerState::default())
    }

    /// Start from a prepared state instead of the defaults.
    pub fn with_state(catalog: FilterCatalog, initial: ScreenerState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            catalog,
            state: Arc::new(tx),
        }
    }

    pub fn catalog(&self) -> &FilterCatalog {
        &self.catalog
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ScreenerState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every effective change.
    pub fn subscribe(&self) -> watch::Receiver<ScreenerState> {
        self.state.subscribe()
    }

    fn update(&self, op: &'static str, apply: impl FnOnce(&mut ScreenerState)) {
        let changed = self.state.send_if_modified(|state| {
            let before = state.clone();
            apply(state);
            *state != before
        });
        if changed {
            debug!(op, "Screener state changed");
        }
    }

    pub fn set_primary_exchanges(&self, values: Vec<String>) {
        self.update("set_primary_exchanges", |s| s.set_primary_exchanges(values));
    }

    pub fn set_primary_sectors(&self, values: Vec<String>) {
        self.update("set_primary_sectors", |s| s.set_primary_sectors(values));
    }

    pub fn set_primary_ratings(&self, letters: Vec<RatingLetter>) {
        self.update("set_primary_ratings", |s| s.set_primary_ratings(letters));
    }

    pub fn set_additional_filter(&self, key: &str, value: FilterValue) {
        self.update("set_additional_filter", |s| s.set_additional_filter(key, value));
    }

    pub fn remove_additional_filter(&self, key: &str) {
        self.update("remove_additional_filter", |s| s.remove_additional_filter(key));
    }

    pub fn clear_all(&self) {
        self.update("clear_all", ScreenerState::clear_all);
    }

    pub fn set_sort(&self, field: &str, direction: Option<SortDirection>) {
        self.update("set_sort", |s| s.set_sort(field, direction));
    }

    pub fn toggle_sort(&self, field: &str) {
        self.update("toggle_sort", |s| s.toggle_sort(field));
    }

    pub fn set_page(&self, page: u32) {
        self.update("set_page", |s| s.set_page(page));
    }

    pub fn set_page_size(&self, size: u32) {
        self.update("set_page_size", |s| s.set_page_size(size));
    }

    pub fn open_filter_edit(&self, key: &str) {
        self.update("open_filter_edit", |s| s.open_filter_edit(key));
    }

    pub fn close_filter_edit(&self) {
        self.update("close_filter_edit", ScreenerState::close_filter_edit);
    }

    pub fn active_filter_count(&self) -> usize {
        self.state.borrow().active_filter_count()
    }

    /// Request for the current state.
    pub fn derive_request(&self) -> ScreenerQueryRequest {
        self.state.borrow().derive_request(&self.catalog)
    }

    /// Query string for the current state.
    pub fn to_query_string(&self) -> String {
        to_query_string(&self.state.borrow(), &self.catalog)
    }

    /// Merge recognized parameters of `query` into the state.
    ///
    /// Returns false when the query carried nothing usable.
    pub fn hydrate_from_query_string(&self, query: &str) -> bool {
        let patch = parse_query_string(query, &self.catalog);
        if patch.is_empty() {
            return false;
        }
        self.update("hydrate", |s| s.apply_query_patch(patch));
        true
    }
}

impl std::fmt::Debug for ScreenerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenerStore")
            .field("state", &*self.state.borrow())
            .finish()
    }
}
