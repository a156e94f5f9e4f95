//! Screener state and its reducer operations.
//!
//! Every operation that changes the result set (primary filters, additional
//! filters, sort, page size) resets `page` to 1 in the same call, so no
//! observer ever sees a stale page number paired with a new filter set.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::catalog::FilterCatalog;
use crate::model::{
    FilterValue, RatingLetter, RatingRange, ScreenerQueryRequest, SortDirection,
};

/// Page sizes offered by the results table.
pub const PAGE_SIZE_OPTIONS: [u32; 4] = [20, 50, 100, 200];

pub const DEFAULT_PAGE_SIZE: u32 = 50;

pub const DEFAULT_SORT_FIELD: &str = "ticker";

/// Filter, sort, and pagination state of one screener view.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenerState {
    pub(crate) exchanges: Vec<String>,
    pub(crate) sectors: Vec<String>,
    pub(crate) ratings: Vec<RatingLetter>,
    pub(crate) additional_filters: BTreeMap<String, FilterValue>,
    pub(crate) sort_field: String,
    pub(crate) sort_direction: SortDirection,
    pub(crate) page: u32,
    pub(crate) page_size: u32,
    pub(crate) active_filter_edit_key: Option<String>,
}

impl Default for ScreenerState {
    fn default() -> Self {
        Self {
            exchanges: Vec::new(),
            sectors: Vec::new(),
            ratings: Vec::new(),
            additional_filters: BTreeMap::new(),
            sort_field: DEFAULT_SORT_FIELD.to_string(),
            sort_direction: SortDirection::Asc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            active_filter_edit_key: None,
        }
    }
}

/// Trim, drop blanks, and drop duplicates while keeping first-seen order.
pub(crate) fn normalize_list(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

/// Trimmed sort field, `None` when blank.
fn sort_field(field: &str) -> Option<&str> {
    let field = field.trim();
    if field.is_empty() {
        warn!("Ignoring blank sort field");
        return None;
    }
    Some(field)
}

fn normalize_ratings(letters: impl IntoIterator<Item = RatingLetter>) -> Vec<RatingLetter> {
    let mut out = Vec::new();
    for letter in letters {
        if !out.contains(&letter) {
            out.push(letter);
        }
    }
    out
}

/// Canonical form of a filter value as stored in the active map.
pub(crate) fn normalize_filter_value(value: FilterValue) -> FilterValue {
    match value.normalized() {
        FilterValue::Multiselect(values) => FilterValue::Multiselect(normalize_list(values)),
        other => other,
    }
}

impl ScreenerState {
    // === Accessors ===

    pub fn exchanges(&self) -> &[String] {
        &self.exchanges
    }

    pub fn sectors(&self) -> &[String] {
        &self.sectors
    }

    pub fn ratings(&self) -> &[RatingLetter] {
        &self.ratings
    }

    pub fn additional_filters(&self) -> &BTreeMap<String, FilterValue> {
        &self.additional_filters
    }

    pub fn additional_filter(&self, key: &str) -> Option<&FilterValue> {
        self.additional_filters.get(key)
    }

    pub fn sort_field(&self) -> &str {
        &self.sort_field
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn active_filter_edit_key(&self) -> Option<&str> {
        self.active_filter_edit_key.as_deref()
    }

    /// Number of additional filters currently applied.
    pub fn active_filter_count(&self) -> usize {
        self.additional_filters.len()
    }

    /// True when both states would produce the same query.
    ///
    /// Only the transient edit session is ignored.
    pub fn same_query_inputs(&self, other: &Self) -> bool {
        self.exchanges == other.exchanges
            && self.sectors == other.sectors
            && self.ratings == other.ratings
            && self.additional_filters == other.additional_filters
            && self.sort_field == other.sort_field
            && self.sort_direction == other.sort_direction
            && self.page == other.page
            && self.page_size == other.page_size
    }

    /// Same as `same_query_inputs` but also ignores the page number.
    pub(crate) fn same_result_set(&self, other: &Self) -> bool {
        self.exchanges == other.exchanges
            && self.sectors == other.sectors
            && self.ratings == other.ratings
            && self.additional_filters == other.additional_filters
            && self.sort_field == other.sort_field
            && self.sort_direction == other.sort_direction
            && self.page_size == other.page_size
    }

    // === Primary filters ===

    pub fn set_primary_exchanges(&mut self, values: impl IntoIterator<Item = String>) {
        self.exchanges = normalize_list(values);
        self.page = 1;
    }

    pub fn set_primary_sectors(&mut self, values: impl IntoIterator<Item = String>) {
        self.sectors = normalize_list(values);
        self.page = 1;
    }

    pub fn set_primary_ratings(&mut self, letters: impl IntoIterator<Item = RatingLetter>) {
        self.ratings = normalize_ratings(letters);
        self.page = 1;
    }

    // === Additional filters ===

    /// Store a filter value, or delete the key when the value is empty.
    ///
    /// Multiselect values for the primary keys (`exchange`, `sector`,
    /// `rating`) are routed to their primary controls so the additional map
    /// never shadows them. Other value types for those keys are ignored.
    pub fn set_additional_filter(&mut self, key: &str, value: FilterValue) {
        let value = normalize_filter_value(value);

        match (key, value) {
            ("exchange", FilterValue::Multiselect(values)) => self.set_primary_exchanges(values),
            ("sector", FilterValue::Multiselect(values)) => self.set_primary_sectors(values),
            ("rating", FilterValue::Multiselect(values)) => {
                self.set_primary_ratings(values.iter().filter_map(|v| v.parse().ok()))
            }
            ("exchange" | "sector" | "rating", other) => {
                warn!(key, value_type = ?other.value_type(), "Ignoring non-multiselect value for primary filter");
            }
            (key, value) if !value.is_set() => self.remove_additional_filter(key),
            (key, value) => {
                self.additional_filters.insert(key.to_string(), value);
                self.page = 1;
            }
        }
    }

    /// Delete a filter. Absent keys are a no-op and leave the page alone.
    pub fn remove_additional_filter(&mut self, key: &str) {
        if self.additional_filters.remove(key).is_some() {
            self.page = 1;
        }
    }

    /// Drop every filter; sort and page size are kept.
    pub fn clear_all(&mut self) {
        self.exchanges.clear();
        self.sectors.clear();
        self.ratings.clear();
        self.additional_filters.clear();
        self.page = 1;
    }

    // === Sorting ===

    /// Sort by `field`, ascending unless told otherwise. Surrounding
    /// whitespace is trimmed and a blank field is ignored.
    pub fn set_sort(&mut self, field: &str, direction: Option<SortDirection>) {
        let Some(field) = sort_field(field) else {
            return;
        };
        self.sort_field = field.to_string();
        self.sort_direction = direction.unwrap_or_default();
        self.page = 1;
    }

    /// Flip direction on the active field, otherwise sort ascending by `field`.
    pub fn toggle_sort(&mut self, field: &str) {
        let Some(field) = sort_field(field) else {
            return;
        };
        if self.sort_field == field {
            self.sort_direction = self.sort_direction.flipped();
        } else {
            self.sort_field = field.to_string();
            self.sort_direction = SortDirection::Asc;
        }
        self.page = 1;
    }

    // === Pagination ===

    /// Jump to a page. Values below 1 clamp to 1; the upper bound is the
    /// caller's concern.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Change the page size. Sizes outside [`PAGE_SIZE_OPTIONS`] are ignored.
    pub fn set_page_size(&mut self, size: u32) {
        if !PAGE_SIZE_OPTIONS.contains(&size) {
            warn!(size, "Ignoring unsupported page size");
            return;
        }
        self.page_size = size;
        self.page = 1;
    }

    // === Edit session ===

    pub fn open_filter_edit(&mut self, key: &str) {
        self.active_filter_edit_key = Some(key.to_string());
    }

    pub fn close_filter_edit(&mut self) {
        self.active_filter_edit_key = None;
    }

    // === Derived request ===

    /// Build the outbound request.
    ///
    /// Additional filters are merged by their catalog `api_key`. Entries that
    /// are unknown to the catalog, whose value does not match the declared
    /// type, or that are empty are left out.
    pub fn derive_request(&self, catalog: &FilterCatalog) -> ScreenerQueryRequest {
        let mut request = ScreenerQueryRequest {
            sort_by: self.sort_field.clone(),
            sort_order: self.sort_direction,
            limit: self.page_size,
            offset: u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size),
            exchange: self.exchanges.clone(),
            sector: self.sectors.clone(),
            rating: RatingRange::from_letters(&self.ratings),
            filters: BTreeMap::new(),
        };

        for (key, value) in &self.additional_filters {
            let Some(definition) = catalog.lookup(key) else {
                debug!(key = %key, "Skipping filter unknown to the catalog");
                continue;
            };
            if definition.value_type != value.value_type() {
                debug!(
                    key = %key,
                    expected = ?definition.value_type,
                    actual = ?value.value_type(),
                    "Skipping filter with mismatched value type"
                );
                continue;
            }

            let value = normalize_filter_value(value.clone());
            if !value.is_set() || catalog.is_primary(definition.api_key) {
                continue;
            }
            request.filters.insert(definition.api_key.to_string(), value);
        }

        request
    }
}
