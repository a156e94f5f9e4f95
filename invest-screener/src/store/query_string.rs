//! Screener state <-> URL query string.
//!
//! Defaults are omitted when serializing, so a pristine state produces an
//! empty query. Parsing is per field: a malformed value leaves only that
//! field untouched and never fails the whole query.
//!
//! Multiselect values are comma-joined; values that themselves contain a
//! comma do not survive a round trip.

use std::collections::BTreeMap;
use tracing::debug;
use url::form_urlencoded;

use super::state::{normalize_list, ScreenerState, DEFAULT_PAGE_SIZE, DEFAULT_SORT_FIELD, PAGE_SIZE_OPTIONS};
use crate::catalog::{FilterCatalog, FilterDefinition};
use crate::model::{FilterValue, RangeValue, RatingLetter, SortDirection, ValueType};

const PARAM_EXCHANGE: &str = "exchange";
const PARAM_SECTOR: &str = "sector";
const PARAM_RATING: &str = "rating";
const PARAM_SORT: &str = "sort";
const PARAM_ORDER: &str = "order";
const PARAM_PAGE: &str = "page";
const PARAM_SIZE: &str = "size";

const FIXED_PARAMS: [&str; 7] = [
    PARAM_EXCHANGE,
    PARAM_SECTOR,
    PARAM_RATING,
    PARAM_SORT,
    PARAM_ORDER,
    PARAM_PAGE,
    PARAM_SIZE,
];

// ============================================================================
// Serialization
// ============================================================================

/// Encode the query-relevant part of a state.
///
/// Additional filters that are unknown to the catalog, mistyped, or empty are
/// left out, mirroring what `derive_request` sends.
pub fn to_query_string(state: &ScreenerState, catalog: &FilterCatalog) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());

    if !state.exchanges.is_empty() {
        query.append_pair(PARAM_EXCHANGE, &state.exchanges.join(","));
    }
    if !state.sectors.is_empty() {
        query.append_pair(PARAM_SECTOR, &state.sectors.join(","));
    }
    if !state.ratings.is_empty() {
        let letters: Vec<&str> = state.ratings.iter().map(|l| l.as_str()).collect();
        query.append_pair(PARAM_RATING, &letters.join(","));
    }
    if state.sort_field != DEFAULT_SORT_FIELD {
        query.append_pair(PARAM_SORT, &state.sort_field);
    }
    if state.sort_direction != SortDirection::Asc {
        query.append_pair(PARAM_ORDER, state.sort_direction.as_str());
    }
    if state.page > 1 {
        query.append_pair(PARAM_PAGE, &state.page.to_string());
    }
    if state.page_size != DEFAULT_PAGE_SIZE {
        query.append_pair(PARAM_SIZE, &state.page_size.to_string());
    }

    for (key, value) in &state.additional_filters {
        let known = catalog
            .lookup(key)
            .is_some_and(|def| def.value_type == value.value_type() && !catalog.is_primary(def.key));
        if !known {
            continue;
        }
        if let Some(encoded) = encode_filter_value(value) {
            query.append_pair(key, &encoded);
        }
    }

    query.finish()
}

fn encode_filter_value(value: &FilterValue) -> Option<String> {
    match value {
        FilterValue::Range(range) => {
            let range = range.normalized();
            range.is_set().then(|| format_range(&range))
        }
        FilterValue::Boolean(true) => Some("true".to_string()),
        FilterValue::Boolean(false) => None,
        FilterValue::Multiselect(values) => {
            let values = normalize_list(values.iter().cloned());
            (!values.is_empty()).then(|| values.join(","))
        }
    }
}

/// `min-max` with either side possibly empty (`10-`, `-20`, `-5-10`).
pub fn format_range(range: &RangeValue) -> String {
    let bound = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    format!("{}-{}", bound(range.min), bound(range.max))
}

// ============================================================================
// Parsing
// ============================================================================

/// Fields recovered from a query string. `None` means "not present or
/// malformed", and leaves the current value alone when applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPatch {
    pub exchanges: Option<Vec<String>>,
    pub sectors: Option<Vec<String>>,
    pub ratings: Option<Vec<RatingLetter>>,
    pub sort_field: Option<String>,
    pub sort_direction: Option<SortDirection>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub additional_filters: BTreeMap<String, FilterValue>,
}

impl QueryPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Whether the query names any parameter the screener understands.
pub fn has_recognized_params(query: &str, catalog: &FilterCatalog) -> bool {
    form_urlencoded::parse(trim_question_mark(query).as_bytes()).any(|(key, _)| {
        FIXED_PARAMS.contains(&&*key)
            || catalog
                .lookup(&key)
                .is_some_and(|def| !catalog.is_primary(def.key))
    })
}

/// Parse a query string into a patch. Unknown parameters are ignored.
pub fn parse_query_string(query: &str, catalog: &FilterCatalog) -> QueryPatch {
    let mut patch = QueryPatch::default();

    for (key, raw) in form_urlencoded::parse(trim_question_mark(query).as_bytes()) {
        match &*key {
            PARAM_EXCHANGE => patch.exchanges = parse_list(&raw),
            PARAM_SECTOR => patch.sectors = parse_list(&raw),
            PARAM_RATING => patch.ratings = parse_ratings(&raw),
            PARAM_SORT => patch.sort_field = parse_sort_field(&raw),
            PARAM_ORDER => patch.sort_direction = raw.trim().parse().ok(),
            PARAM_PAGE => patch.page = parse_page(&raw),
            PARAM_SIZE => patch.page_size = parse_page_size(&raw),
            other => {
                let Some(definition) = catalog.lookup(other).filter(|d| !catalog.is_primary(d.key)) else {
                    continue;
                };
                match parse_filter_value(definition, &raw) {
                    Some(value) => {
                        patch.additional_filters.insert(definition.key.to_string(), value);
                    }
                    None => debug!(key = other, raw = %raw, "Ignoring malformed filter parameter"),
                }
            }
        }
    }

    patch
}

fn trim_question_mark(query: &str) -> &str {
    query.strip_prefix('?').unwrap_or(query)
}

/// Comma-separated list; `None` when nothing usable remains.
pub fn parse_list(raw: &str) -> Option<Vec<String>> {
    let values = normalize_list(raw.split(',').map(str::to_string));
    (!values.is_empty()).then_some(values)
}

/// Comma-separated rating letters. Unknown letters are dropped.
pub fn parse_ratings(raw: &str) -> Option<Vec<RatingLetter>> {
    let mut letters = Vec::new();
    for letter in raw.split(',').filter_map(|s| s.trim().parse::<RatingLetter>().ok()) {
        if !letters.contains(&letter) {
            letters.push(letter);
        }
    }
    (!letters.is_empty()).then_some(letters)
}

fn parse_sort_field(raw: &str) -> Option<String> {
    let field = raw.trim();
    (!field.is_empty()).then(|| field.to_string())
}

/// Positive page number.
pub fn parse_page(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|page| *page >= 1)
}

/// Page size from the supported set.
pub fn parse_page_size(raw: &str) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|size| PAGE_SIZE_OPTIONS.contains(size))
}

/// Parse `min-max` where either bound may be empty or negative.
///
/// Every `-` is tried as the separator, left to right, and the first split
/// whose sides are both empty or finite numbers wins: `-5-10` is
/// `[-5, 10]`, `--3` is `[.., -3]`, and `-5` is `[.., 5]`. A result with no
/// bounds counts as malformed.
pub fn parse_range(raw: &str) -> Option<RangeValue> {
    let raw = raw.trim();
    raw.match_indices('-')
        .find_map(|(idx, _)| {
            let min = parse_bound(&raw[..idx])?;
            let max = parse_bound(&raw[idx + 1..])?;
            Some(RangeValue::new(min, max))
        })
        .filter(RangeValue::is_set)
}

fn parse_bound(raw: &str) -> Option<Option<f64>> {
    if raw.is_empty() {
        return Some(None);
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some)
}

/// `true` is the only accepted boolean; anything else is absent.
pub fn parse_boolean(raw: &str) -> Option<bool> {
    (raw.trim() == "true").then_some(true)
}

/// Parse a filter parameter according to its declared type.
pub fn parse_filter_value(definition: &FilterDefinition, raw: &str) -> Option<FilterValue> {
    match definition.value_type {
        ValueType::Range => parse_range(raw).map(FilterValue::Range),
        ValueType::Boolean => parse_boolean(raw).map(FilterValue::Boolean),
        ValueType::Multiselect => parse_list(raw).map(FilterValue::Multiselect),
    }
}

// ============================================================================
// Hydration
// ============================================================================

impl ScreenerState {
    /// Merge a parsed patch into this state.
    ///
    /// Present fields replace current values and parsed filters are merged
    /// over the active map. The page comes from the patch when given;
    /// otherwise it resets to 1 if the result set changed.
    pub fn apply_query_patch(&mut self, patch: QueryPatch) {
        let before = self.clone();

        if let Some(exchanges) = patch.exchanges {
            self.exchanges = exchanges;
        }
        if let Some(sectors) = patch.sectors {
            self.sectors = sectors;
        }
        if let Some(ratings) = patch.ratings {
            self.ratings = ratings;
        }
        if let Some(field) = patch.sort_field {
            self.sort_field = field;
        }
        if let Some(direction) = patch.sort_direction {
            self.sort_direction = direction;
        }
        if let Some(size) = patch.page_size {
            self.page_size = size;
        }
        self.additional_filters.extend(patch.additional_filters);

        match patch.page {
            Some(page) => self.page = page,
            None if !self.same_result_set(&before) => self.page = 1,
            None => {}
        }
    }
}
