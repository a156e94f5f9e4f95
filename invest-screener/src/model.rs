//! Screener data model.
//!
//! Filter values, rating letters, sort direction, and the wire shapes of the
//! screening and options endpoints.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Ratings
// ============================================================================

/// Letter rating shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RatingLetter {
    A,
    B,
    C,
    D,
}

impl RatingLetter {
    /// All letters, best first.
    pub const ALL: [RatingLetter; 4] = [Self::A, Self::B, Self::C, Self::D];

    /// Numeric value used by the remote API.
    ///
    /// The domain is not contiguous: there is no 0.
    pub const fn value(self) -> i32 {
        match self {
            Self::A => 3,
            Self::B => 2,
            Self::C => 1,
            Self::D => -1,
        }
    }

    /// Letter for a numeric API rating, if it is one of the known values.
    pub fn from_value(value: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|letter| f64::from(letter.value()) == value)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for RatingLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatingLetter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            other => Err(format!("Unknown rating letter: {}", other)),
        }
    }
}

/// Inclusive numeric rating bounds sent to the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRange {
    pub min: i32,
    pub max: i32,
}

impl RatingRange {
    /// Collapse a letter selection into `[min, max]` of its numeric values.
    ///
    /// This is lossy for non-contiguous selections: `{A, D}` becomes
    /// `[-1, 3]`, which also covers B and C. Returns `None` for an empty
    /// selection.
    pub fn from_letters(letters: &[RatingLetter]) -> Option<Self> {
        let values = letters.iter().map(|l| l.value());
        let min = values.clone().min()?;
        let max = values.max()?;
        Some(Self { min, max })
    }
}

// ============================================================================
// Sorting
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("Unknown sort direction: {}", other)),
        }
    }
}

// ============================================================================
// Filter Values
// ============================================================================

/// Declared value type of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Range,
    Boolean,
    Multiselect,
}

/// Optional numeric bounds. Non-finite bounds count as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl RangeValue {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn at_least(min: f64) -> Self {
        Self::new(Some(min), None)
    }

    pub fn at_most(max: f64) -> Self {
        Self::new(None, Some(max))
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self::new(Some(min), Some(max))
    }

    /// Drop bounds that are NaN or infinite.
    pub fn normalized(self) -> Self {
        Self {
            min: self.min.filter(|v| v.is_finite()),
            max: self.max.filter(|v| v.is_finite()),
        }
    }

    /// At least one usable bound is present.
    pub fn is_set(&self) -> bool {
        let range = self.normalized();
        range.min.is_some() || range.max.is_some()
    }
}

/// Value of an additional filter, tagged by the filter's declared type.
///
/// Serializes to the bare JSON shape the API expects (`{min,max}`, `true`,
/// or `["..."]`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Range(RangeValue),
    Boolean(bool),
    Multiselect(Vec<String>),
}

impl FilterValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Range(_) => ValueType::Range,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Multiselect(_) => ValueType::Multiselect,
        }
    }

    /// Whether this value actually constrains results.
    ///
    /// Empty ranges, `false`, and empty selections are the "empty" form of
    /// their type and never appear in the active filter map.
    pub fn is_set(&self) -> bool {
        match self {
            Self::Range(range) => range.is_set(),
            Self::Boolean(flag) => *flag,
            Self::Multiselect(values) => values.iter().any(|v| !v.trim().is_empty()),
        }
    }

    /// Canonical form: finite bounds only, blank selections removed.
    pub fn normalized(self) -> Self {
        match self {
            Self::Range(range) => Self::Range(range.normalized()),
            Self::Boolean(flag) => Self::Boolean(flag),
            Self::Multiselect(values) => Self::Multiselect(
                values
                    .into_iter()
                    .filter(|v| !v.trim().is_empty())
                    .collect(),
            ),
        }
    }
}

impl From<RangeValue> for FilterValue {
    fn from(range: RangeValue) -> Self {
        Self::Range(range)
    }
}

impl From<bool> for FilterValue {
    fn from(flag: bool) -> Self {
        Self::Boolean(flag)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multiselect(values)
    }
}

// ============================================================================
// Wire Shapes
// ============================================================================

/// Outbound body for `POST /screener/`.
///
/// Empty fields are omitted from the JSON entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenerQueryRequest {
    pub sort_by: String,
    pub sort_order: SortDirection,
    pub limit: u32,
    pub offset: u64,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exchange: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sector: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<RatingRange>,

    /// Additional filters keyed by their API field name.
    #[serde(flatten)]
    pub filters: BTreeMap<String, FilterValue>,
}

/// Read an explicit `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A row of screener results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub symbol_id: String,
    pub ticker: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub exchange: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sector: String,

    // Trend indicators
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub smart_momentum: Option<f64>,
    #[serde(default)]
    pub trend_strength: Option<f64>,
    #[serde(default)]
    pub retracement: Option<f64>,
    #[serde(default)]
    pub new_high_low: Option<String>,
    #[serde(default)]
    pub days_since_rating: Option<f64>,

    // Fundamentals
    #[serde(default)]
    pub pe_ratio: Option<f64>,
    #[serde(default)]
    pub ps_ratio: Option<f64>,
    #[serde(default)]
    pub pb_ratio: Option<f64>,
    #[serde(default)]
    pub pcf_ratio: Option<f64>,
    #[serde(default)]
    pub pd_ratio: Option<f64>,
    #[serde(default)]
    pub dividend_yield: Option<f64>,
    #[serde(default)]
    pub revenue_growth_3m: Option<f64>,
    #[serde(default)]
    pub revenue_growth_12m: Option<f64>,
    #[serde(default)]
    pub earnings_growth_3m: Option<f64>,
    #[serde(default)]
    pub earnings_growth_12m: Option<f64>,

    // Performance
    #[serde(default)]
    pub return_1w: Option<f64>,
    #[serde(default)]
    pub return_1m: Option<f64>,
    #[serde(default)]
    pub return_3m: Option<f64>,
    #[serde(default)]
    pub return_6m: Option<f64>,
    #[serde(default)]
    pub return_12m: Option<f64>,
    #[serde(default)]
    pub return_ytd: Option<f64>,
    #[serde(default)]
    pub sharpe_6m: Option<f64>,
    #[serde(default)]
    pub sharpe_12m: Option<f64>,
    #[serde(default)]
    pub liquidity_usd_m: Option<f64>,
}

impl Stock {
    /// A row with only identity fields populated.
    pub fn new(symbol_id: impl Into<String>, ticker: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol_id: symbol_id.into(),
            ticker: ticker.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Response of `POST /screener/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerResponse {
    pub results: Vec<Stock>,
    pub total_count: u64,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u64,
}

/// Dropdown vocabulary from `GET /screener/options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenerOptions {
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub exchanges: Vec<String>,
    #[serde(default)]
    pub sectors: Vec<String>,
}
