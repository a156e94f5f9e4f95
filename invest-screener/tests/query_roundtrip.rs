//! Property tests for screener state transitions and URL encoding.

use proptest::prelude::*;

use invest_screener::store::{parse_query_string, to_query_string};
use invest_screener::{FilterCatalog, FilterValue, RangeValue, RatingLetter, ScreenerState, SortDirection};

#[derive(Debug, Clone)]
enum Op {
    Exchanges(Vec<String>),
    Sectors(Vec<String>),
    Ratings(Vec<RatingLetter>),
    Range(&'static str, RangeValue),
    Flag(&'static str, bool),
    Countries(Vec<String>),
    Remove(&'static str),
    Sort(&'static str, SortDirection),
    Toggle(&'static str),
    PageSize(u32),
    ClearAll,
}

const RANGE_KEYS: &[&str] = &["pe_ratio", "dividend_yield", "return_1m", "sharpe_6m", "liquidity_usd_m"];
const FLAG_KEYS: &[&str] = &["new_high", "new_low"];
const SORT_FIELDS: &[&str] = &["ticker", "name", "pe_ratio", "return_12m", "", "  ", " pe_ratio", "name "];

fn words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Za-z0-9]{1,8}", 0..4)
}

fn bound() -> impl Strategy<Value = Option<f64>> {
    prop::option::of((-10_000i32..10_000).prop_map(|v| f64::from(v) / 4.0))
}

fn rating() -> impl Strategy<Value = RatingLetter> {
    prop::sample::select(RatingLetter::ALL.to_vec())
}

fn direction() -> impl Strategy<Value = SortDirection> {
    prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        words().prop_map(Op::Exchanges),
        words().prop_map(Op::Sectors),
        prop::collection::vec(rating(), 0..4).prop_map(Op::Ratings),
        (prop::sample::select(RANGE_KEYS), bound(), bound())
            .prop_map(|(key, min, max)| Op::Range(key, RangeValue::new(min, max))),
        (prop::sample::select(FLAG_KEYS), any::<bool>()).prop_map(|(key, on)| Op::Flag(key, on)),
        words().prop_map(Op::Countries),
        prop::sample::select(RANGE_KEYS).prop_map(Op::Remove),
        (prop::sample::select(SORT_FIELDS), direction()).prop_map(|(field, dir)| Op::Sort(field, dir)),
        prop::sample::select(SORT_FIELDS).prop_map(Op::Toggle),
        prop::sample::select(vec![20u32, 50, 100, 200]).prop_map(Op::PageSize),
        Just(Op::ClearAll),
    ]
}

fn apply(state: &mut ScreenerState, op: Op) {
    match op {
        Op::Exchanges(values) => state.set_primary_exchanges(values),
        Op::Sectors(values) => state.set_primary_sectors(values),
        Op::Ratings(letters) => state.set_primary_ratings(letters),
        Op::Range(key, range) => state.set_additional_filter(key, FilterValue::Range(range)),
        Op::Flag(key, on) => state.set_additional_filter(key, FilterValue::Boolean(on)),
        Op::Countries(values) => state.set_additional_filter("country", FilterValue::Multiselect(values)),
        Op::Remove(key) => state.remove_additional_filter(key),
        Op::Sort(field, direction) => state.set_sort(field, Some(direction)),
        Op::Toggle(field) => state.toggle_sort(field),
        Op::PageSize(size) => state.set_page_size(size),
        Op::ClearAll => state.clear_all(),
    }
}

proptest! {
    #[test]
    fn url_round_trip_preserves_request(ops in prop::collection::vec(op(), 0..12), page in 1u32..40) {
        let catalog = FilterCatalog::standard();
        let mut state = ScreenerState::default();
        for op in ops {
            apply(&mut state, op);
        }
        state.set_page(page);

        let query = to_query_string(&state, &catalog);
        let mut restored = ScreenerState::default();
        restored.apply_query_patch(parse_query_string(&query, &catalog));

        prop_assert_eq!(restored.derive_request(&catalog), state.derive_request(&catalog));
        prop_assert_eq!(to_query_string(&restored, &catalog), query);
    }

    #[test]
    fn result_set_change_resets_page(ops in prop::collection::vec(op(), 0..6), next in op(), page in 2u32..40) {
        let mut state = ScreenerState::default();
        for op in ops {
            apply(&mut state, op);
        }
        state.set_page(page);

        let before = state.clone();
        apply(&mut state, next);

        let mut ignoring_page = state.clone();
        ignoring_page.set_page(page);
        if ignoring_page != before {
            prop_assert_eq!(state.page(), 1);
        }
        prop_assert!(state.active_filter_count() <= RANGE_KEYS.len() + FLAG_KEYS.len() + 1);
    }

    #[test]
    fn malformed_query_never_panics(query in "[a-z_=&?%0-9.,-]{0,64}") {
        let catalog = FilterCatalog::standard();
        let mut state = ScreenerState::default();
        state.apply_query_patch(parse_query_string(&query, &catalog));
        prop_assert!(state.page() >= 1);
    }
}
