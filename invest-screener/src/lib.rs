//! Investment Dashboard Screener
//!
//! Client-side query engine for the stock screener: a user-composed filter
//! set is kept in an observable store, mirrored into the URL, and turned into
//! debounced, cancelable queries against the screening API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Screener (mounted view)                  │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ URL Sync     │◄─►│ Store        │──►│ Query Executor   │  │
//! │  │ (300ms)      │   │ (watch)      │   │ (400ms, cancel)  │  │
//! │  └──────────────┘   └──────┬───────┘   └────────┬─────────┘  │
//! │                            │                    │            │
//! │                     ┌──────▼───────┐   ┌────────▼─────────┐  │
//! │                     │ Catalog      │   │ ScreeningService │  │
//! │                     └──────────────┘   └────────▲─────────┘  │
//! │                                        ┌────────┴─────────┐  │
//! │                                        │ Options Cache    │  │
//! │                                        └──────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! - **Primary filters**: market, sector, and rating, with dedicated controls.
//! - **Additional filters**: sparse map of catalog keys to typed values; a
//!   key is present only while its filter constrains results.
//! - **Authoritative request**: only the most recently issued query may
//!   update results, loading, or error state.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod api;
pub mod catalog;
pub mod executor;
pub mod format;
pub mod model;
pub mod options;
pub mod screener;
pub mod session;
pub mod store;
pub mod url_sync;

pub use api::{ApiClient, ApiError, AuthProvider, HttpScreeningService, ScreeningService};
pub use catalog::{FilterCatalog, FilterCategory, FilterDefinition};
pub use executor::{QueryExecutor, QueryState};
pub use model::{
    FilterValue, RangeValue, RatingLetter, RatingRange, ScreenerOptions, ScreenerQueryRequest,
    ScreenerResponse, SortDirection, Stock, ValueType,
};
pub use options::{OptionsCache, OptionsState};
pub use screener::Screener;
pub use session::Session;
pub use store::{ScreenerState, ScreenerStore};
pub use url_sync::{Location, MemoryLocation, UrlSynchronizer};
