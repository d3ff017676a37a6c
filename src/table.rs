use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

/// Raw time-series row as exported in Dates.csv: Date, Clicks, Impressions, CTR, Position.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTimeRow(pub String, pub u64, pub u64, pub String, pub f64);

/// Raw dimension row: label, Clicks, Impressions, CTR, Position (pages only).
#[derive(Debug, Clone, Deserialize)]
pub struct RawDimensionRow(
    pub String,
    pub u64,
    pub u64,
    pub String,
    #[serde(default)] pub Option<f64>,
);

#[derive(Debug, Clone, PartialEq)]
pub struct TimeRow {
    pub date: NaiveDate,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionRow {
    pub label: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: Option<f64>,
    pub click_share: f64,
    pub impression_share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRow {
    pub month: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

/// Normalize a percentage cell ("12,34%", "5.67%") to its numeric value.
pub fn parse_percent(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_end_matches('%').trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Percentage cells that fail to parse count as 0 so row counts stay stable.
pub fn percent_or_zero(raw: &str) -> f64 {
    parse_percent(raw).unwrap_or(0.0)
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse dates, normalize the CTR column and sort chronologically.
/// Rows with an unparseable date are dropped.
pub fn clean_time_series(raw: &[RawTimeRow]) -> Vec<TimeRow> {
    let mut rows: Vec<TimeRow> = raw
        .iter()
        .filter_map(|r| match NaiveDate::parse_from_str(&r.0, DATE_FORMAT) {
            Ok(date) => Some(TimeRow {
                date,
                clicks: r.1,
                impressions: r.2,
                ctr: percent_or_zero(&r.3),
                position: r.4,
            }),
            Err(_) => {
                warn!(
                    action = "parse",
                    component = "table_cleaner",
                    date = r.0.as_str(),
                    "Dropping time-series row with unparseable date"
                );
                None
            }
        })
        .collect();

    rows.sort_by(|a, b| a.date.cmp(&b.date));
    rows
}

/// Normalize the CTR column and derive each row's share of the table's own
/// click and impression totals. Input order is preserved.
pub fn clean_dimension(raw: &[RawDimensionRow]) -> Vec<DimensionRow> {
    let total_clicks: u64 = raw.iter().map(|r| r.1).sum();
    let total_impressions: u64 = raw.iter().map(|r| r.2).sum();

    raw.iter()
        .map(|r| DimensionRow {
            label: r.0.clone(),
            clicks: r.1,
            impressions: r.2,
            ctr: percent_or_zero(&r.3),
            position: r.4,
            click_share: share(r.1, total_clicks),
            impression_share: share(r.2, total_impressions),
        })
        .collect()
}

fn share(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Stable descending sort by clicks; ties keep their original order.
pub fn sort_by_clicks_desc(mut rows: Vec<DimensionRow>) -> Vec<DimensionRow> {
    rows.sort_by(|a, b| b.clicks.cmp(&a.clicks));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(label: &str, clicks: u64, impressions: u64, ctr: &str) -> RawDimensionRow {
        RawDimensionRow(label.to_string(), clicks, impressions, ctr.to_string(), None)
    }

    #[test]
    fn parses_comma_and_dot_percentages() {
        assert_eq!(parse_percent("12,34%"), Some(12.34));
        assert_eq!(parse_percent("5.67%"), Some(5.67));
        assert_eq!(parse_percent("0%"), Some(0.0));
        assert_eq!(parse_percent(" 3,1% "), Some(3.1));
        assert_eq!(parse_percent("42"), Some(42.0));
    }

    #[test]
    fn malformed_percentages_are_none_then_zero() {
        assert_eq!(parse_percent("n/a"), None);
        assert_eq!(parse_percent(""), None);
        assert_eq!(parse_percent("%"), None);
        assert_eq!(percent_or_zero("n/a"), 0.0);
    }

    #[test]
    fn time_series_is_sorted_and_bad_dates_dropped() {
        let raw = vec![
            RawTimeRow("2025-03-02".into(), 5, 100, "5%".into(), 4.0),
            RawTimeRow("not-a-date".into(), 9, 900, "1%".into(), 9.0),
            RawTimeRow("2025-03-01".into(), 3, 50, "6%".into(), 2.0),
        ];

        let rows = clean_time_series(&raw);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert_eq!(rows[0].ctr, 6.0);
    }

    #[test]
    fn shares_are_scoped_to_the_table() {
        let rows = clean_dimension(&[
            dim("mobile", 75, 400, "18,75%"),
            dim("desktop", 25, 600, "4,17%"),
        ]);

        assert_eq!(rows[0].click_share, 75.0);
        assert_eq!(rows[1].click_share, 25.0);
        assert_eq!(rows[0].impression_share, 40.0);
        assert_eq!(rows[1].impression_share, 60.0);
        // insertion order preserved
        assert_eq!(rows[0].label, "mobile");
    }

    #[test]
    fn zero_totals_yield_zero_shares() {
        let rows = clean_dimension(&[dim("a", 0, 0, "0%"), dim("b", 0, 0, "0%")]);
        assert_eq!(rows[0].click_share, 0.0);
        assert_eq!(rows[1].impression_share, 0.0);
    }

    #[test]
    fn clicks_sort_is_stable_for_ties() {
        let rows = clean_dimension(&[
            dim("first", 10, 1, "0%"),
            dim("second", 20, 1, "0%"),
            dim("third", 10, 1, "0%"),
        ]);
        let sorted = sort_by_clicks_desc(rows);
        let labels: Vec<&str> = sorted.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["second", "first", "third"]);
    }
}
