//! Result table formatting and pagination arithmetic.

use crate::model::{RatingLetter, Stock};

/// Placeholder for absent values.
pub const EMPTY_CELL: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// How a column renders its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormat {
    Text,
    Number { decimals: usize },
    SignedPercent,
    Rating,
    Liquidity,
}

/// A results table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableColumn {
    /// Stock field, also the sort key
    pub key: &'static str,
    pub label: &'static str,
    pub sortable: bool,
    pub align: Align,
    pub format: CellFormat,
}

const fn column(key: &'static str, label: &'static str, align: Align, format: CellFormat) -> TableColumn {
    TableColumn {
        key,
        label,
        sortable: true,
        align,
        format,
    }
}

pub static DEFAULT_TABLE_COLUMNS: &[TableColumn] = &[
    column("ticker", "Ticker", Align::Left, CellFormat::Text),
    column("name", "Name", Align::Left, CellFormat::Text),
    column("exchange", "Market", Align::Left, CellFormat::Text),
    column("sector", "Sector", Align::Left, CellFormat::Text),
    column("rating", "Rating", Align::Center, CellFormat::Rating),
    column("return_1m", "1M Return", Align::Right, CellFormat::SignedPercent),
    column("return_3m", "3M Return", Align::Right, CellFormat::SignedPercent),
    column("return_12m", "12M Return", Align::Right, CellFormat::SignedPercent),
    column("pe_ratio", "P/E", Align::Right, CellFormat::Number { decimals: 1 }),
    column("dividend_yield", "Div Yield", Align::Right, CellFormat::SignedPercent),
    column("liquidity_usd_m", "Liquidity", Align::Right, CellFormat::Liquidity),
];

/// A cell's raw value.
enum Cell<'a> {
    Text(&'a str),
    Number(Option<f64>),
}

fn cell<'a>(stock: &'a Stock, key: &str) -> Cell<'a> {
    let number = match key {
        "symbol_id" => return Cell::Text(&stock.symbol_id),
        "ticker" => return Cell::Text(&stock.ticker),
        "name" => return Cell::Text(&stock.name),
        "country" => return Cell::Text(&stock.country),
        "exchange" => return Cell::Text(&stock.exchange),
        "sector" => return Cell::Text(&stock.sector),
        "new_high_low" => return Cell::Text(stock.new_high_low.as_deref().unwrap_or("")),
        "rating" => stock.rating,
        "smart_momentum" => stock.smart_momentum,
        "trend_strength" => stock.trend_strength,
        "retracement" => stock.retracement,
        "days_since_rating" => stock.days_since_rating,
        "pe_ratio" => stock.pe_ratio,
        "ps_ratio" => stock.ps_ratio,
        "pb_ratio" => stock.pb_ratio,
        "pcf_ratio" => stock.pcf_ratio,
        "pd_ratio" => stock.pd_ratio,
        "dividend_yield" => stock.dividend_yield,
        "revenue_growth_3m" => stock.revenue_growth_3m,
        "revenue_growth_12m" => stock.revenue_growth_12m,
        "earnings_growth_3m" => stock.earnings_growth_3m,
        "earnings_growth_12m" => stock.earnings_growth_12m,
        "return_1w" => stock.return_1w,
        "return_1m" => stock.return_1m,
        "return_3m" => stock.return_3m,
        "return_6m" => stock.return_6m,
        "return_12m" => stock.return_12m,
        "return_ytd" => stock.return_ytd,
        "sharpe_6m" => stock.sharpe_6m,
        "sharpe_12m" => stock.sharpe_12m,
        "liquidity_usd_m" => stock.liquidity_usd_m,
        _ => None,
    };
    Cell::Number(number)
}

/// Render one cell of `stock` for `column`.
pub fn format_cell(stock: &Stock, column: &TableColumn) -> String {
    match cell(stock, column.key) {
        Cell::Text("") => EMPTY_CELL.to_string(),
        Cell::Text(text) => text.to_string(),
        Cell::Number(value) => match column.format {
            CellFormat::Text => value.map_or_else(|| EMPTY_CELL.to_string(), |v| v.to_string()),
            CellFormat::Number { decimals } => format_number(value, decimals),
            CellFormat::SignedPercent => format_percent(value),
            CellFormat::Rating => format_rating(value),
            CellFormat::Liquidity => format_liquidity(value),
        },
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

pub fn format_number(value: Option<f64>, decimals: usize) -> String {
    finite(value).map_or_else(|| EMPTY_CELL.to_string(), |v| format!("{:.*}", decimals, v))
}

/// `+1.23%` / `-0.50%`.
pub fn format_percent(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) if v >= 0.0 => format!("+{:.2}%", v),
        Some(v) => format!("{:.2}%", v),
        None => EMPTY_CELL.to_string(),
    }
}

pub fn format_rating(value: Option<f64>) -> String {
    value
        .and_then(RatingLetter::from_value)
        .map_or_else(|| EMPTY_CELL.to_string(), |letter| letter.to_string())
}

/// Liquidity in USD millions, shown as billions from 1000 up.
pub fn format_liquidity(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) if v >= 1000.0 => format!("{:.1}B", v / 1000.0),
        Some(v) => format!("{:.1}M", v),
        None => EMPTY_CELL.to_string(),
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Page arithmetic for a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32, total_count: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
            total_count,
        }
    }

    /// Number of pages; an empty result still has one page.
    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(u64::from(self.page_size)).max(1)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    /// 1-based inclusive range of rows on this page, `None` when empty.
    pub fn display_range(&self) -> Option<(u64, u64)> {
        if self.total_count == 0 {
            return None;
        }
        let size = u64::from(self.page_size);
        let start = u64::from(self.page - 1) * size + 1;
        let end = (u64::from(self.page) * size).min(self.total_count);
        (start <= end).then_some((start, end))
    }

    /// `Showing 51 to 100 of 1,234 results`.
    pub fn summary(&self) -> String {
        match self.display_range() {
            Some((start, end)) => format!(
                "Showing {} to {} of {} results",
                start,
                end,
                invest_common::util::format_thousands(self.total_count)
            ),
            None => "No results".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatters() {
        assert_eq!(format_number(Some(12.345), 1), "12.3");
        assert_eq!(format_number(None, 2), EMPTY_CELL);
        assert_eq!(format_percent(Some(1.234)), "+1.23%");
        assert_eq!(format_percent(Some(0.0)), "+0.00%");
        assert_eq!(format_percent(Some(-0.5)), "-0.50%");
        assert_eq!(format_percent(Some(f64::NAN)), EMPTY_CELL);
        assert_eq!(format_rating(Some(3.0)), "A");
        assert_eq!(format_rating(Some(-1.0)), "D");
        assert_eq!(format_rating(Some(0.0)), EMPTY_CELL);
        assert_eq!(format_liquidity(Some(1500.0)), "1.5B");
        assert_eq!(format_liquidity(Some(12.34)), "12.3M");
    }

    #[test]
    fn test_format_cell() {
        let mut stock = Stock::new("AAPL.US", "AAPL", "Apple Inc.");
        stock.return_1m = Some(4.2);
        stock.rating = Some(2.0);

        let by_key = |key: &str| {
            DEFAULT_TABLE_COLUMNS
                .iter()
                .find(|c| c.key == key)
                .map(|c| format_cell(&stock, c))
                .unwrap()
        };
        assert_eq!(by_key("ticker"), "AAPL");
        assert_eq!(by_key("sector"), EMPTY_CELL);
        assert_eq!(by_key("rating"), "B");
        assert_eq!(by_key("return_1m"), "+4.20%");
        assert_eq!(by_key("pe_ratio"), EMPTY_CELL);
    }

    #[test]
    fn test_pagination() {
        let pages = Pagination::new(2, 50, 120);
        assert_eq!(pages.total_pages(), 3);
        assert_eq!(pages.display_range(), Some((51, 100)));
        assert!(pages.has_previous());
        assert!(pages.has_next());

        let last = Pagination::new(3, 50, 120);
        assert_eq!(last.display_range(), Some((101, 120)));
        assert!(!last.has_next());
        assert_eq!(last.summary(), "Showing 101 to 120 of 120 results");
    }

    #[test]
    fn test_empty_pagination() {
        let pages = Pagination::new(1, 50, 0);
        assert_eq!(pages.total_pages(), 1);
        assert_eq!(pages.display_range(), None);
        assert_eq!(pages.summary(), "No results");
    }

    #[test]
    fn test_page_beyond_results() {
        let pages = Pagination::new(9, 50, 120);
        assert_eq!(pages.display_range(), None);
    }
}
