//! Static registry of screener filter definitions.
//!
//! Definitions are fixed at build time and looked up by key. The primary
//! dimensions (market, sector, rating) are listed here for completeness but
//! have dedicated always-visible controls, so they are excluded from the
//! additional-filters menu.

use serde::Serialize;
use std::fmt;

use crate::model::ValueType;

/// Menu grouping for filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterCategory {
    #[serde(rename = "trendrating")]
    TrendIndicators,
    Fundamentals,
    Performance,
    #[serde(rename = "others")]
    Other,
}

impl FilterCategory {
    /// Categories in menu order.
    pub const ALL: [FilterCategory; 4] = [
        Self::TrendIndicators,
        Self::Fundamentals,
        Self::Performance,
        Self::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::TrendIndicators => "Trendrating",
            Self::Fundamentals => "Fundamentals",
            Self::Performance => "Performance",
            Self::Other => "Others",
        }
    }
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Metadata for one filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterDefinition {
    /// Unique key, also used as the URL parameter name
    pub key: &'static str,
    /// Display label
    pub label: &'static str,
    pub category: FilterCategory,
    pub value_type: ValueType,
    /// Field name in the screening request body
    pub api_key: &'static str,
    /// Unit suffix for display (e.g. `%`, `days`)
    pub unit: Option<&'static str>,
    pub description: Option<&'static str>,
}

impl FilterDefinition {
    const fn range(
        key: &'static str,
        label: &'static str,
        category: FilterCategory,
        unit: Option<&'static str>,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            label,
            category,
            value_type: ValueType::Range,
            api_key: key,
            unit,
            description: Some(description),
        }
    }

    const fn boolean(key: &'static str, label: &'static str, description: &'static str) -> Self {
        Self {
            key,
            label,
            category: FilterCategory::TrendIndicators,
            value_type: ValueType::Boolean,
            api_key: key,
            unit: None,
            description: Some(description),
        }
    }

    const fn multiselect(key: &'static str, label: &'static str, description: &'static str) -> Self {
        Self {
            key,
            label,
            category: FilterCategory::Other,
            value_type: ValueType::Multiselect,
            api_key: key,
            unit: None,
            description: Some(description),
        }
    }
}

use FilterCategory::{Fundamentals, Other, Performance, TrendIndicators};

/// Keys with dedicated primary controls.
pub const PRIMARY_FILTER_KEYS: &[&str] = &["exchange", "sector", "rating"];

/// Every known filter, in declaration order.
pub static FILTER_DEFINITIONS: &[FilterDefinition] = &[
    // Trend indicators
    FilterDefinition::range("smart_momentum", "Smart Momentum", TrendIndicators, None, "Momentum indicator score"),
    FilterDefinition::range("retracement", "Retracement", TrendIndicators, Some("%"), "Retracement percentage from peak"),
    FilterDefinition::range("trend_strength", "Trend Strength", TrendIndicators, None, "Trend strength (0-100)"),
    FilterDefinition::boolean("new_low", "New Low", "Stock at new low"),
    FilterDefinition::boolean("new_high", "New High", "Stock at new high"),
    FilterDefinition::range("days_since_rating", "Days since rating", TrendIndicators, Some("days"), "Days since rating was assigned"),
    // Fundamentals
    FilterDefinition::range("pe_ratio", "P/E Ratio", Fundamentals, None, "Price to Earnings ratio"),
    FilterDefinition::range("ps_ratio", "P/S Ratio", Fundamentals, None, "Price to Sales ratio"),
    FilterDefinition::range("pb_ratio", "P/B Ratio", Fundamentals, None, "Price to Book ratio"),
    FilterDefinition::range("pcf_ratio", "P/CF Ratio", Fundamentals, None, "Price to Cash Flow ratio"),
    FilterDefinition::range("pd_ratio", "P/D Ratio", Fundamentals, None, "Price to Dividend ratio"),
    FilterDefinition::range("dividend_yield", "Dividend Yield", Fundamentals, Some("%"), "Dividend yield percentage"),
    FilterDefinition::range("revenue_growth_3m", "3M Sales Growth", Fundamentals, Some("%"), "3-month revenue growth"),
    FilterDefinition::range("revenue_growth_12m", "12M Sales Growth", Fundamentals, Some("%"), "12-month revenue growth"),
    FilterDefinition::range("earnings_growth_3m", "3M Earnings Growth", Fundamentals, Some("%"), "3-month earnings growth"),
    FilterDefinition::range("earnings_growth_12m", "12M Earnings Growth", Fundamentals, Some("%"), "12-month earnings growth"),
    // Performance
    FilterDefinition::range("return_1w", "Last Week", Performance, Some("%"), "Last week return"),
    FilterDefinition::range("return_1m", "Last Month", Performance, Some("%"), "Last month return"),
    FilterDefinition::range("return_3m", "Last 3 Months", Performance, Some("%"), "Last 3 months return"),
    FilterDefinition::range("return_6m", "Last 6 Months", Performance, Some("%"), "Last 6 months return"),
    FilterDefinition::range("return_12m", "Last 12 Months", Performance, Some("%"), "Last 12 months return"),
    FilterDefinition::range("return_ytd", "Year to Date", Performance, Some("%"), "Year to date return"),
    FilterDefinition::range("sharpe_12m", "Last 12 Months Risk Adjusted", Performance, None, "12-month Sharpe ratio"),
    FilterDefinition::range("sharpe_6m", "Last 6 Months Risk Adjusted", Performance, None, "6-month Sharpe ratio"),
    // Other
    FilterDefinition::multiselect("country", "Domicile", "Country of domicile"),
    FilterDefinition::range("liquidity_usd_m", "Liquidity (USD Millions)", Other, Some("M USD"), "Liquidity in USD millions"),
    FilterDefinition::multiselect("exchange", "Market", "Stock exchange"),
    FilterDefinition::multiselect("sector", "Sector", "Industry sector"),
    FilterDefinition::multiselect("rating", "Rating", "Trendrating rating (A, B, C, D)"),
];

/// Read-only view over a set of filter definitions.
#[derive(Debug, Clone, Copy)]
pub struct FilterCatalog {
    definitions: &'static [FilterDefinition],
}

impl FilterCatalog {
    pub const fn new(definitions: &'static [FilterDefinition]) -> Self {
        Self { definitions }
    }

    /// The built-in catalog.
    pub const fn standard() -> Self {
        Self::new(FILTER_DEFINITIONS)
    }

    pub fn lookup(&self, key: &str) -> Option<&'static FilterDefinition> {
        self.definitions.iter().find(|def| def.key == key)
    }

    /// Definitions in one category, in declaration order.
    pub fn list_by_category(
        &self,
        category: FilterCategory,
    ) -> impl Iterator<Item = &'static FilterDefinition> {
        let definitions = self.definitions;
        definitions
            .iter()
            .filter(move |def| def.category == category)
    }

    pub fn is_primary(&self, key: &str) -> bool {
        PRIMARY_FILTER_KEYS.contains(&key)
    }

    /// Definitions offered in the additional-filters menu, grouped by
    /// category in menu order.
    pub fn additional_filters(&self) -> Vec<&'static FilterDefinition> {
        FilterCategory::ALL
            .into_iter()
            .flat_map(|category| self.list_by_category(category))
            .filter(|def| !self.is_primary(def.key))
            .collect()
    }

    pub fn all(&self) -> &'static [FilterDefinition] {
        self.definitions
    }
}

impl Default for FilterCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_unique() {
        let keys: HashSet<_> = FILTER_DEFINITIONS.iter().map(|d| d.key).collect();
        assert_eq!(keys.len(), FILTER_DEFINITIONS.len());
    }

    #[test]
    fn test_lookup() {
        let catalog = FilterCatalog::standard();
        let pe = catalog.lookup("pe_ratio").unwrap();
        assert_eq!(pe.label, "P/E Ratio");
        assert_eq!(pe.value_type, ValueType::Range);
        assert_eq!(pe.api_key, "pe_ratio");
        assert!(catalog.lookup("market_cap").is_none());
    }

    #[test]
    fn test_list_by_category_keeps_declaration_order() {
        let catalog = FilterCatalog::standard();
        let keys: Vec<_> = catalog
            .list_by_category(FilterCategory::TrendIndicators)
            .map(|d| d.key)
            .collect();
        assert_eq!(
            keys,
            vec![
                "smart_momentum",
                "retracement",
                "trend_strength",
                "new_low",
                "new_high",
                "days_since_rating"
            ]
        );
    }

    #[test]
    fn test_additional_filters_exclude_primary() {
        let catalog = FilterCatalog::standard();
        let additional = catalog.additional_filters();
        assert!(additional.iter().all(|d| !catalog.is_primary(d.key)));
        assert_eq!(additional.len(), FILTER_DEFINITIONS.len() - PRIMARY_FILTER_KEYS.len());
        assert_eq!(additional.first().map(|d| d.key), Some("smart_momentum"));
        assert_eq!(additional.last().map(|d| d.key), Some("liquidity_usd_m"));
    }

    #[test]
    fn test_category_labels() {
        let labels: Vec<_> = FilterCategory::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["Trendrating", "Fundamentals", "Performance", "Others"]);
    }
}
